// Genetic parameter search: operators, evaluation and the generation loop
pub mod evaluation;
pub mod operator;
pub mod propagation;
pub mod reporting;
pub mod search;
pub mod termination;
