// Genetic parameter optimization
pub mod optimization;
