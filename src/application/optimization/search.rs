//! Generation loop of the genetic parameter search.
//!
//! Each generation: check termination, evaluate every candidate, record the best one,
//! optionally confirm it with a second backtest, then run the enabled operators to build
//! the next generation. All randomness comes from one seeded `StdRng`, so a run is
//! reproducible from its seed given a deterministic evaluator.

use crate::application::optimization::evaluation::{EvaluationSettings, PopulationEvaluator};
use crate::application::optimization::operator::GeneticOperator;
use crate::application::optimization::propagation::PropagationOperator;
use crate::application::optimization::reporting::{GenerationReport, SearchOutcome};
use crate::domain::errors::OptimizationError;
use crate::domain::optimization::{Candidate, ParameterSpace, Population};
use crate::domain::ports::{FitnessEvaluator, TerminationCondition};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Must be even and non-zero.
    pub population_size: usize,
    /// Fixed seed for a reproducible run; a random seed is drawn (and reported) otherwise.
    pub seed: Option<u64>,
    /// Re-run the best candidate of each generation to report its aggregate score.
    pub confirm_best: bool,
    pub evaluation: EvaluationSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            population_size: 20,
            seed: None,
            confirm_best: true,
            evaluation: EvaluationSettings::default(),
        }
    }
}

type GenerationObserver = Box<dyn FnMut(&GenerationReport) + Send>;

pub struct GeneticSearch {
    space: ParameterSpace,
    settings: SearchSettings,
    evaluator: PopulationEvaluator,
    operators: Vec<Box<dyn GeneticOperator>>,
    termination: Box<dyn TerminationCondition>,
    observer: Option<GenerationObserver>,
}

impl GeneticSearch {
    /// Creates a search running the propagation operator each generation.
    pub fn new(
        space: ParameterSpace,
        settings: SearchSettings,
        evaluator: Arc<dyn FitnessEvaluator>,
        termination: impl TerminationCondition + 'static,
    ) -> Result<Self, OptimizationError> {
        if settings.population_size == 0 || settings.population_size % 2 != 0 {
            return Err(OptimizationError::invalid_argument(format!(
                "population size must be a positive even number, got {}",
                settings.population_size
            )));
        }

        let evaluator = PopulationEvaluator::new(evaluator, settings.evaluation.clone());
        Ok(Self {
            space,
            settings,
            evaluator,
            operators: vec![Box::new(PropagationOperator::new())],
            termination: Box::new(termination),
            observer: None,
        })
    }

    /// Replaces the operator pipeline. Operators run in order.
    pub fn with_operators(mut self, operators: Vec<Box<dyn GeneticOperator>>) -> Self {
        self.operators = operators;
        self
    }

    /// Registers a callback invoked after every completed generation.
    pub fn on_generation_complete(
        mut self,
        observer: impl FnMut(&GenerationReport) + Send + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn operators(&self) -> &[Box<dyn GeneticOperator>] {
        &self.operators
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub async fn run(&mut self) -> Result<SearchOutcome, OptimizationError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        info!(
            %run_id,
            seed,
            population = self.settings.population_size,
            parameters = self.space.len(),
            "Genetic search starting"
        );

        let mut population = self
            .space
            .initial_population(self.settings.population_size, &mut rng)?;
        let mut reports = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut total_evaluations: u64 = 0;
        let mut generation: usize = 1;

        while !self
            .termination
            .should_stop(&population, generation, total_evaluations)
        {
            let (evaluated, stats) = self.evaluator.evaluate(population).await;
            total_evaluations += stats.evaluations;

            let fittest = evaluated.best().cloned().ok_or_else(|| {
                OptimizationError::invalid_state("generation has no evaluated candidate")
            })?;
            let best_fitness = fittest.fitness.unwrap_or(f64::NEG_INFINITY);

            let aggregate_score = if self.settings.confirm_best {
                match self.evaluator.evaluate_one(&fittest.params).await {
                    Ok(score) => Some(score),
                    Err(e) => {
                        warn!(generation, "Confirmation run of best candidate failed: {}", e);
                        None
                    }
                }
            } else {
                None
            };

            if best
                .as_ref()
                .and_then(|b| b.fitness)
                .is_none_or(|current| best_fitness > current)
            {
                best = Some(fittest.clone());
            }

            population = self.apply_operators(evaluated, &mut rng);

            let report = GenerationReport {
                generation,
                best_fitness,
                best_parameters: fittest.params,
                aggregate_score,
                evaluations: stats.evaluations,
                cache_hits: stats.cache_hits,
                failures: stats.failures,
                operator_invocations: self.operators.iter().map(|op| op.invocations()).sum(),
            };
            info!(
                generation,
                fitness = report.best_fitness,
                sharpe = ?report.aggregate_score,
                evaluations = report.evaluations,
                failures = report.failures,
                params = %report.best_parameters,
                "Generation complete"
            );
            if let Some(observer) = self.observer.as_mut() {
                observer(&report);
            }
            reports.push(report);
            generation += 1;
        }

        let finished_at = Utc::now();
        info!(
            %run_id,
            generations = reports.len(),
            total_evaluations,
            best_fitness = ?best.as_ref().and_then(|b| b.fitness),
            "Genetic search finished"
        );

        Ok(SearchOutcome {
            run_id,
            seed,
            started_at,
            finished_at,
            total_evaluations,
            generations: reports,
            best,
        })
    }

    fn apply_operators(&mut self, population: Population, rng: &mut StdRng) -> Population {
        let mut population = population;
        for operator in self.operators.iter_mut().filter(|op| op.is_enabled()) {
            if operator.requires_evaluated_population() && !population.is_fully_evaluated() {
                warn!(
                    operator = operator.name(),
                    "Skipping operator: population is not fully evaluated"
                );
                continue;
            }
            population = operator.apply(&population, rng);
        }
        population
    }
}
