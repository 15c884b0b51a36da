use crate::domain::optimization::parameter_set::ParameterSet;
use serde::Serialize;

/// One member of a population: its parameters and, once evaluated, its fitness.
///
/// `fitness == None` means "not evaluated in the current generation", which is distinct
/// from an evaluated score of zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub params: ParameterSet,
    pub fitness: Option<f64>,
}

impl Candidate {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            fitness: None,
        }
    }

    pub fn with_fitness(params: ParameterSet, fitness: f64) -> Self {
        Self {
            params,
            fitness: Some(fitness),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Drops a fitness value that no longer describes the parameters.
    pub fn invalidate(&mut self) {
        self.fitness = None;
    }
}
