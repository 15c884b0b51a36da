//! Search configuration: population, generations, evaluation limits.
//!
//! Values come from the `[search]` table of the TOML file, overridden by
//! `OPTIMIZER_*` environment variables.

use crate::application::optimization::evaluation::EvaluationSettings;
use crate::application::optimization::search::SearchSettings;
use crate::config::parse_var;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population_size: usize,
    /// Generations to run; the search stops once the generation index exceeds it.
    pub max_generations: usize,
    pub seed: Option<u64>,
    pub concurrency: usize,
    pub eval_timeout_secs: u64,
    pub failure_fitness: f64,
    pub cache_fitness: bool,
    pub confirm_best: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            max_generations: 3,
            seed: None,
            concurrency: 4,
            eval_timeout_secs: 600,
            failure_fitness: -1.0e9,
            cache_fitness: true,
            confirm_best: true,
        }
    }
}

impl SearchConfig {
    /// Overlays values found through `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = parse_var(lookup, "OPTIMIZER_POPULATION_SIZE")? {
            self.population_size = v;
        }
        if let Some(v) = parse_var(lookup, "OPTIMIZER_MAX_GENERATIONS")? {
            self.max_generations = v;
        }
        if let Some(v) = parse_var(lookup, "OPTIMIZER_SEED")? {
            self.seed = Some(v);
        }
        if let Some(v) = parse_var(lookup, "OPTIMIZER_CONCURRENCY")? {
            self.concurrency = v;
        }
        if let Some(v) = parse_var(lookup, "OPTIMIZER_EVAL_TIMEOUT_SECS")? {
            self.eval_timeout_secs = v;
        }
        if let Some(v) = parse_var(lookup, "OPTIMIZER_FAILURE_FITNESS")? {
            self.failure_fitness = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 || self.population_size % 2 != 0 {
            bail!(
                "Population size must be an even number >= 2, got {}",
                self.population_size
            );
        }
        if self.concurrency == 0 {
            bail!("Evaluation concurrency must be at least 1");
        }
        if self.eval_timeout_secs == 0 {
            bail!("Evaluation timeout must be at least 1 second");
        }
        if !self.failure_fitness.is_finite() {
            bail!("Failure fitness must be a finite number");
        }
        Ok(())
    }

    pub fn to_settings(&self) -> SearchSettings {
        SearchSettings {
            population_size: self.population_size,
            seed: self.seed,
            confirm_best: self.confirm_best,
            evaluation: EvaluationSettings {
                concurrency: self.concurrency,
                timeout: Duration::from_secs(self.eval_timeout_secs),
                failure_fitness: self.failure_fitness,
                cache_fitness: self.cache_fitness,
            },
        }
    }
}
