//! Concurrent fitness evaluation of a whole generation.
//!
//! Every candidate gets a score from the current generation: either a fresh evaluation
//! or a cached score for an identical parameter set. Results are written back only once
//! the whole batch has finished, so operators never see a half-evaluated population.

use crate::domain::errors::OptimizationError;
use crate::domain::optimization::{ParameterSet, Population};
use crate::domain::ports::FitnessEvaluator;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    /// Maximum number of evaluations in flight.
    pub concurrency: usize,
    pub timeout: Duration,
    /// Fitness given to candidates whose evaluation failed or timed out.
    pub failure_fitness: f64,
    pub cache_fitness: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(600),
            failure_fitness: -1.0e9,
            cache_fitness: true,
        }
    }
}

/// Counters for one evaluated generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    /// Calls made to the fitness evaluator.
    pub evaluations: u64,
    pub cache_hits: u64,
    pub failures: u64,
}

pub struct PopulationEvaluator {
    evaluator: Arc<dyn FitnessEvaluator>,
    settings: EvaluationSettings,
    /// Successful scores for this run. Unbounded; it lives as long as the evaluator, one search.
    cache: HashMap<ParameterSet, f64>,
}

impl PopulationEvaluator {
    pub fn new(evaluator: Arc<dyn FitnessEvaluator>, settings: EvaluationSettings) -> Self {
        Self {
            evaluator,
            settings,
            cache: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Runs a single evaluation under the configured timeout.
    pub async fn evaluate_one(&self, params: &ParameterSet) -> Result<f64, OptimizationError> {
        match tokio::time::timeout(self.settings.timeout, self.evaluator.evaluate(params)).await {
            Ok(Ok(fitness)) if fitness.is_finite() => Ok(fitness),
            Ok(Ok(fitness)) => Err(OptimizationError::evaluation_failure(format!(
                "non-finite fitness {}",
                fitness
            ))),
            Ok(Err(e)) => Err(OptimizationError::evaluation_failure(format!("{:#}", e))),
            Err(_) => Err(OptimizationError::evaluation_failure(format!(
                "timed out after {}s",
                self.settings.timeout.as_secs_f64()
            ))),
        }
    }

    /// Scores every candidate of `population`, ignoring any fitness it already carries.
    pub async fn evaluate(&mut self, population: Population) -> (Population, EvaluationStats) {
        let mut candidates = population.into_candidates();
        let mut stats = EvaluationStats::default();

        // Identical parameter sets within the batch share one evaluation.
        let mut pending: Vec<(ParameterSet, Vec<usize>)> = Vec::new();
        let mut slots: HashMap<ParameterSet, usize> = HashMap::new();

        for (idx, candidate) in candidates.iter_mut().enumerate() {
            candidate.invalidate();
            if !self.settings.cache_fitness {
                pending.push((candidate.params.clone(), vec![idx]));
                continue;
            }
            if let Some(fitness) = self.cache.get(&candidate.params) {
                candidate.fitness = Some(*fitness);
                stats.cache_hits += 1;
                continue;
            }
            match slots.get(&candidate.params) {
                Some(&slot) => {
                    pending[slot].1.push(idx);
                    stats.cache_hits += 1;
                }
                None => {
                    slots.insert(candidate.params.clone(), pending.len());
                    pending.push((candidate.params.clone(), vec![idx]));
                }
            }
        }

        let this = &*self;
        let outcomes: Vec<(ParameterSet, Vec<usize>, Result<f64, OptimizationError>)> =
            stream::iter(pending)
                .map(|(params, targets)| async move {
                    let result = this.evaluate_one(&params).await;
                    (params, targets, result)
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        for (params, targets, result) in outcomes {
            stats.evaluations += 1;
            let fitness = match result {
                Ok(fitness) => {
                    debug!(params = %params, fitness, "Candidate evaluated");
                    if self.settings.cache_fitness {
                        self.cache.insert(params, fitness);
                    }
                    fitness
                }
                Err(e) => {
                    warn!(params = %params, "Candidate degraded to failure fitness: {}", e);
                    stats.failures += 1;
                    self.settings.failure_fitness
                }
            };
            for idx in targets {
                candidates[idx].fitness = Some(fitness);
            }
        }

        (Population::new(candidates), stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimization::Candidate;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Scores a set as the value of "a"; fails for negative values, hangs for 999.
    struct LinearEvaluator {
        calls: AtomicU64,
    }

    #[async_trait]
    impl FitnessEvaluator for LinearEvaluator {
        async fn evaluate(&self, params: &ParameterSet) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let a = params.get("a")?.as_f64();
            if a < 0.0 {
                bail!("backtest crashed");
            }
            if a == 999.0 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(a)
        }
    }

    fn evaluator(settings: EvaluationSettings) -> (PopulationEvaluator, Arc<LinearEvaluator>) {
        let inner = Arc::new(LinearEvaluator {
            calls: AtomicU64::new(0),
        });
        (PopulationEvaluator::new(inner.clone(), settings), inner)
    }

    fn population(values: &[i64]) -> Population {
        values
            .iter()
            .map(|v| Candidate::new(ParameterSet::from_entries([("a", *v)]).unwrap()))
            .collect()
    }

    fn fitness(population: &Population) -> Vec<Option<f64>> {
        population.iter().map(|c| c.fitness).collect()
    }

    #[tokio::test]
    async fn test_scores_are_written_to_matching_candidates() {
        let (mut evaluator, _) = evaluator(EvaluationSettings::default());
        let (scored, stats) = evaluator.evaluate(population(&[3, 1, 2, 5])).await;

        assert_eq!(
            fitness(&scored),
            vec![Some(3.0), Some(1.0), Some(2.0), Some(5.0)]
        );
        assert_eq!(stats.evaluations, 4);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_failure_fitness() {
        let settings = EvaluationSettings {
            failure_fitness: -100.0,
            ..EvaluationSettings::default()
        };
        let (mut evaluator, _) = evaluator(settings);
        let (scored, stats) = evaluator.evaluate(population(&[-1, 4])).await;

        assert_eq!(fitness(&scored), vec![Some(-100.0), Some(4.0)]);
        assert_eq!(stats.failures, 1);
        assert_eq!(evaluator.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let settings = EvaluationSettings {
            timeout: Duration::from_millis(50),
            failure_fitness: -1.0,
            ..EvaluationSettings::default()
        };
        let (mut evaluator, _) = evaluator(settings);
        let (scored, stats) = evaluator.evaluate(population(&[999, 2])).await;

        assert_eq!(fitness(&scored), vec![Some(-1.0), Some(2.0)]);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn test_cache_skips_repeated_parameter_sets() {
        let (mut evaluator, inner) = evaluator(EvaluationSettings::default());

        let (_, first) = evaluator.evaluate(population(&[1, 2, 2, 3])).await;
        assert_eq!(first.evaluations, 3);
        assert_eq!(first.cache_hits, 1);

        let (scored, second) = evaluator.evaluate(population(&[2, 3, 4, 4])).await;
        assert_eq!(second.evaluations, 1);
        assert_eq!(second.cache_hits, 3);
        assert_eq!(
            fitness(&scored),
            vec![Some(2.0), Some(3.0), Some(4.0), Some(4.0)]
        );
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_disabled_cache_evaluates_everything() {
        let settings = EvaluationSettings {
            cache_fitness: false,
            ..EvaluationSettings::default()
        };
        let (mut evaluator, inner) = evaluator(settings);

        evaluator.evaluate(population(&[1, 1])).await;
        evaluator.evaluate(population(&[1, 1])).await;
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
        assert_eq!(evaluator.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_existing_fitness_is_not_trusted() {
        let (mut evaluator, _) = evaluator(EvaluationSettings::default());
        let params = ParameterSet::from_entries([("a", 7)]).unwrap();
        let stale = Population::new(vec![Candidate::with_fitness(params, 123.0)]);

        let (scored, _) = evaluator.evaluate(stale).await;
        assert_eq!(fitness(&scored), vec![Some(7.0)]);
    }
}
