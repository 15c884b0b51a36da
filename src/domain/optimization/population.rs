//! Ordered collection of candidates for one generation.
//!
//! The genetic search keeps the population size even and constant across generations;
//! that rule is checked when the initial population is built, not here.

use crate::domain::errors::OptimizationError;
use crate::domain::optimization::candidate::Candidate;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Population {
    candidates: Vec<Candidate>,
}

impl Population {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut [Candidate] {
        &mut self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.candidates.iter()
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }

    pub fn is_fully_evaluated(&self) -> bool {
        self.candidates.iter().all(Candidate::is_evaluated)
    }

    /// Indices of the `k` fittest candidates, best first.
    ///
    /// Ties keep their original relative order. Unevaluated candidates and NaN fitness rank
    /// below every comparable one. `k` must be in `1..=len`.
    pub fn top_k_indices(&self, k: usize) -> Result<Vec<usize>, OptimizationError> {
        if k == 0 {
            return Err(OptimizationError::invalid_argument(
                "top-k requires k > 0",
            ));
        }
        if k > self.candidates.len() {
            return Err(OptimizationError::invalid_argument(format!(
                "top-k requested {} candidates from a population of {}",
                k,
                self.candidates.len()
            )));
        }

        let mut indices: Vec<usize> = (0..self.candidates.len()).collect();
        // sort_by is stable, so equal fitness keeps first-seen order
        indices.sort_by(|&a, &b| {
            rank(&self.candidates[b]).total_cmp(&rank(&self.candidates[a]))
        });
        indices.truncate(k);
        Ok(indices)
    }

    /// The `k` fittest candidates, best first. See [`Population::top_k_indices`].
    pub fn top_k(&self, k: usize) -> Result<Vec<&Candidate>, OptimizationError> {
        Ok(self
            .top_k_indices(k)?
            .into_iter()
            .map(|idx| &self.candidates[idx])
            .collect())
    }

    /// Fittest evaluated candidate, first seen on ties.
    pub fn best(&self) -> Option<&Candidate> {
        if self.candidates.iter().all(|c| c.fitness.is_none()) {
            return None;
        }
        self.top_k(1).ok().and_then(|top| top.into_iter().next())
    }
}

impl FromIterator<Candidate> for Population {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Sort key with NaN mapped to the bottom; `0.0` absorbs `-0.0` so signed zeros tie.
fn rank(candidate: &Candidate) -> f64 {
    match candidate.fitness {
        Some(f) if !f.is_nan() => f + 0.0,
        _ => f64::NEG_INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimization::parameter_set::ParameterSet;

    fn population_with(fitness: &[f64]) -> Population {
        fitness
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let params = ParameterSet::from_entries([("id", i as i64)]).unwrap();
                Candidate::with_fitness(params, *f)
            })
            .collect()
    }

    fn ids(candidates: &[&Candidate]) -> Vec<i64> {
        candidates
            .iter()
            .map(|c| match c.params.get("id").unwrap() {
                crate::domain::optimization::parameter_set::ParamValue::Int(v) => v,
                other => panic!("unexpected id {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_top_k_orders_by_fitness_with_stable_ties() {
        let population = population_with(&[0.1, 0.9, 0.5, 0.9, 0.3]);
        let top = population.top_k(3).unwrap();

        assert_eq!(ids(&top), vec![1, 3, 2]);
        assert_eq!(top[2].fitness, Some(0.5));
    }

    #[test]
    fn test_top_k_rejects_zero() {
        let population = population_with(&[1.0, 2.0]);
        assert!(matches!(
            population.top_k(0),
            Err(OptimizationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_top_k_rejects_more_than_population() {
        let population = population_with(&[1.0, 2.0]);
        assert!(matches!(
            population.top_k(3),
            Err(OptimizationError::InvalidArgument { .. })
        ));
        assert_eq!(population.top_k(2).unwrap().len(), 2);
    }

    #[test]
    fn test_unevaluated_candidates_rank_last() {
        let mut population = population_with(&[-5.0, 1.0]);
        population.candidates_mut()[1].invalidate();

        let top = population.top_k(2).unwrap();
        assert_eq!(ids(&top), vec![0, 1]);
        assert!(!population.is_fully_evaluated());
    }

    #[test]
    fn test_nan_fitness_ranks_last() {
        let population = population_with(&[1.0, f64::NAN, 5.0, 3.0, f64::NAN, 4.0]);
        assert_eq!(population.top_k_indices(3).unwrap(), vec![2, 5, 3]);
        assert_eq!(population.top_k_indices(6).unwrap(), vec![2, 5, 3, 0, 1, 4]);
    }

    #[test]
    fn test_ranking_large_populations_with_nan_is_total() {
        for size in [20usize, 40, 100, 500] {
            let fitness: Vec<f64> = (0..size)
                .map(|i| if i % 7 == 0 { f64::NAN } else { ((i * 37) % 11) as f64 })
                .collect();
            let population = population_with(&fitness);

            let ranked = population.top_k_indices(size).unwrap();
            let comparable = fitness.iter().filter(|f| !f.is_nan()).count();
            for pair in ranked[..comparable].windows(2) {
                assert!(fitness[pair[0]] >= fitness[pair[1]]);
            }
            assert!(ranked[comparable..].iter().all(|&i| fitness[i].is_nan()));
        }
    }

    #[test]
    fn test_best_returns_first_of_equal_fitness() {
        let population = population_with(&[0.2, 0.7, 0.7]);
        let best = population.best().unwrap();
        assert_eq!(ids(&[best]), vec![1]);

        let unevaluated: Population = population
            .into_candidates()
            .into_iter()
            .map(|c| Candidate::new(c.params))
            .collect();
        assert!(unevaluated.best().is_none());
    }
}
