// Parameter sets, candidates and populations
pub mod optimization;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
