pub mod candidate;
pub mod parameter_set;
pub mod parameter_space;
pub mod population;

pub use candidate::Candidate;
pub use parameter_set::{ParamValue, ParameterSet, ParameterSetBuilder};
pub use parameter_space::{ParameterSpace, ParameterSpec};
pub use population::Population;
