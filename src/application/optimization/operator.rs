use crate::domain::optimization::Population;
use rand::RngCore;

/// A step that turns the current generation into the next one.
///
/// Operators never abort the search: an operator that can't run for a generation hands
/// back the population unchanged.
pub trait GeneticOperator: Send {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Whether every candidate must carry a fitness from the current generation.
    fn requires_evaluated_population(&self) -> bool;

    /// Number of successful applications so far.
    fn invocations(&self) -> u64;

    fn apply(&mut self, current: &Population, rng: &mut dyn RngCore) -> Population;
}
