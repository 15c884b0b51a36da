//! Elite-driven parameter propagation.
//!
//! Each generation the operator ranks the population, takes the fittest few as the
//! elite, picks one parameter value from a donor among them and copies it into every
//! candidate scoring below the weakest elite member. Candidates at or above that cutoff
//! pass through untouched.

use crate::application::optimization::operator::GeneticOperator;
use crate::domain::errors::OptimizationError;
use crate::domain::optimization::{ParamValue, Population};
use rand::{Rng, RngCore};
use tracing::{debug, warn};

/// Number of candidates treated as the elite.
pub const DEFAULT_ELITE_SIZE: usize = 3;

/// Outcome of one successful propagation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    pub population: Population,
    /// Index of the donor in the input population.
    pub donor_index: usize,
    pub key: String,
    pub value: ParamValue,
    pub cutoff: f64,
    /// Indices of the candidates whose parameter was overwritten.
    pub mutated: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct PropagationOperator {
    elite_size: usize,
    enabled: bool,
    invoked: u64,
}

impl PropagationOperator {
    pub fn new() -> Self {
        Self {
            elite_size: DEFAULT_ELITE_SIZE,
            enabled: true,
            invoked: 0,
        }
    }

    pub fn with_elite_size(elite_size: usize) -> Result<Self, OptimizationError> {
        if elite_size == 0 {
            return Err(OptimizationError::invalid_argument(
                "elite size must be at least 1",
            ));
        }
        Ok(Self {
            elite_size,
            ..Self::new()
        })
    }

    pub fn elite_size(&self) -> usize {
        self.elite_size
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Computes the next generation without touching the invocation counter.
    ///
    /// The donor is drawn from the elite minus its weakest member, so at least two
    /// candidates are needed. The parameter key is drawn from the donor's full key set.
    /// Overwritten candidates lose their fitness, since it no longer describes them.
    pub fn try_propagate(
        &self,
        current: &Population,
        rng: &mut dyn RngCore,
    ) -> Result<Propagation, OptimizationError> {
        if current.is_empty() {
            return Err(OptimizationError::invalid_state("population is empty"));
        }
        if !current.is_fully_evaluated() {
            return Err(OptimizationError::invalid_state(
                "population contains unevaluated candidates",
            ));
        }
        if current.iter().any(|c| c.fitness.is_some_and(f64::is_nan)) {
            return Err(OptimizationError::invalid_state(
                "population contains NaN fitness",
            ));
        }

        let elite_count = self.elite_size.min(current.len());
        let elite = current.top_k_indices(elite_count)?;

        let cutoff = current
            .get(elite[elite_count - 1])
            .and_then(|c| c.fitness)
            .ok_or_else(|| OptimizationError::invalid_state("elite cutoff has no fitness"))?;

        let donor_pool = elite_count - 1;
        if donor_pool == 0 {
            return Err(OptimizationError::invalid_state(format!(
                "donor pool is empty with {} elite candidate(s)",
                elite_count
            )));
        }
        let donor_index = elite[rng.random_range(0..donor_pool)];
        let donor = &current.candidates()[donor_index].params;

        if donor.is_empty() {
            return Err(OptimizationError::invalid_state("donor has no parameters"));
        }
        let key = donor
            .key_at(rng.random_range(0..donor.len()))
            .ok_or_else(|| OptimizationError::invalid_state("donor key out of range"))?
            .to_string();
        let value = donor.get(&key)?;

        // Work on a copy so a failure half way leaves nothing behind.
        let mut next = current.clone();
        let mut mutated = Vec::new();
        for (idx, candidate) in next.candidates_mut().iter_mut().enumerate() {
            if candidate.fitness.is_some_and(|f| f < cutoff) {
                candidate.params.set(&key, value)?;
                candidate.invalidate();
                mutated.push(idx);
            }
        }

        Ok(Propagation {
            population: next,
            donor_index,
            key,
            value,
            cutoff,
            mutated,
        })
    }
}

impl Default for PropagationOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneticOperator for PropagationOperator {
    fn name(&self) -> &str {
        "propagation"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn requires_evaluated_population(&self) -> bool {
        true
    }

    fn invocations(&self) -> u64 {
        self.invoked
    }

    fn apply(&mut self, current: &Population, rng: &mut dyn RngCore) -> Population {
        match self.try_propagate(current, rng) {
            Ok(step) => {
                self.invoked += 1;
                debug!(
                    key = %step.key,
                    value = %step.value,
                    donor = step.donor_index,
                    cutoff = step.cutoff,
                    mutated = step.mutated.len(),
                    "Propagation applied"
                );
                step.population
            }
            Err(e) => {
                warn!("Propagation skipped for this generation: {}", e);
                current.clone()
            }
        }
    }
}
