//! Stop conditions for the genetic search.

use crate::domain::optimization::Population;
use crate::domain::ports::TerminationCondition;

/// Stops once the generation index exceeds `max_generations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimit(pub usize);

impl TerminationCondition for GenerationLimit {
    fn should_stop(&self, _population: &Population, generation: usize, _evaluations: u64) -> bool {
        generation > self.0
    }
}

/// Stops once the cumulative number of fitness evaluations reaches the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationBudget(pub u64);

impl TerminationCondition for EvaluationBudget {
    fn should_stop(&self, _population: &Population, _generation: usize, evaluations: u64) -> bool {
        evaluations >= self.0
    }
}

/// Stops when any of the wrapped conditions does.
pub struct AnyOf(pub Vec<Box<dyn TerminationCondition>>);

impl TerminationCondition for AnyOf {
    fn should_stop(&self, population: &Population, generation: usize, evaluations: u64) -> bool {
        self.0
            .iter()
            .any(|condition| condition.should_stop(population, generation, evaluations))
    }
}
