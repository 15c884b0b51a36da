use crate::domain::optimization::{ParameterSet, Population};
use anyhow::Result;
use async_trait::async_trait;

/// Scores one parameter set, typically by running a full backtest.
///
/// Implementations may be slow and may fail; the search loop degrades failed candidates
/// instead of aborting the run. Each call must be independent of every other call, since
/// a generation is evaluated concurrently.
#[async_trait]
pub trait FitnessEvaluator: Send + Sync {
    async fn evaluate(&self, params: &ParameterSet) -> Result<f64>;
}

/// Plain functions work as synchronous evaluators.
#[async_trait]
impl<F> FitnessEvaluator for F
where
    F: Fn(&ParameterSet) -> Result<f64> + Send + Sync,
{
    async fn evaluate(&self, params: &ParameterSet) -> Result<f64> {
        self(params)
    }
}

/// Decides when the genetic search stops.
pub trait TerminationCondition: Send + Sync {
    fn should_stop(&self, population: &Population, generation: usize, evaluations: u64) -> bool;
}

impl<F> TerminationCondition for F
where
    F: Fn(&Population, usize, u64) -> bool + Send + Sync,
{
    fn should_stop(&self, population: &Population, generation: usize, evaluations: u64) -> bool {
        self(population, generation, evaluations)
    }
}
