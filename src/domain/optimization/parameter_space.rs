//! Search bounds for each tunable parameter and random sampling of the initial population.

use crate::domain::errors::OptimizationError;
use crate::domain::optimization::candidate::Candidate;
use crate::domain::optimization::parameter_set::{ParamValue, ParameterSet};
use crate::domain::optimization::population::Population;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bounds for one parameter. Both ranges are half-open: `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterSpec {
    Int { name: String, min: i64, max: i64 },
    Float { name: String, min: f64, max: f64 },
}

impl ParameterSpec {
    pub fn int(name: impl Into<String>, min: i64, max: i64) -> Self {
        ParameterSpec::Int {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn float(name: impl Into<String>, min: f64, max: f64) -> Self {
        ParameterSpec::Float {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ParameterSpec::Int { name, .. } | ParameterSpec::Float { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<(), OptimizationError> {
        let valid = match self {
            ParameterSpec::Int { min, max, .. } => min < max,
            ParameterSpec::Float { min, max, .. } => {
                min.is_finite() && max.is_finite() && min < max && (max - min).is_finite()
            }
        };
        if !valid {
            return Err(OptimizationError::invalid_argument(format!(
                "parameter '{}' needs finite bounds with min < max",
                self.name()
            )));
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        match self {
            ParameterSpec::Int { min, max, .. } => ParamValue::Int(rng.random_range(*min..*max)),
            ParameterSpec::Float { min, max, .. } => {
                let next: f64 = rng.random();
                ParamValue::Float(min + next * (max - min))
            }
        }
    }

    pub fn contains(&self, value: ParamValue) -> bool {
        match (self, value) {
            (ParameterSpec::Int { min, max, .. }, ParamValue::Int(v)) => *min <= v && v < *max,
            (ParameterSpec::Float { min, max, .. }, ParamValue::Float(v)) => *min <= v && v < *max,
            _ => false,
        }
    }
}

/// Validated list of parameter bounds, in the order parameters appear in each set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSpace {
    specs: Vec<ParameterSpec>,
}

impl ParameterSpace {
    pub fn new(specs: Vec<ParameterSpec>) -> Result<Self, OptimizationError> {
        if specs.is_empty() {
            return Err(OptimizationError::invalid_argument(
                "parameter space must define at least one parameter",
            ));
        }

        let mut names = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !names.insert(spec.name()) {
                return Err(OptimizationError::invalid_argument(format!(
                    "duplicate parameter name '{}'",
                    spec.name()
                )));
            }
        }

        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Draws one parameter set uniformly within the bounds.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<ParameterSet, OptimizationError> {
        self.specs
            .iter()
            .fold(ParameterSet::builder(), |builder, spec| {
                let value = spec.sample(rng);
                builder.with(spec.name(), value)
            })
            .build()
    }

    /// Creates `size` unevaluated candidates. `size` must be even and non-zero.
    pub fn initial_population(
        &self,
        size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Population, OptimizationError> {
        if size == 0 || size % 2 != 0 {
            return Err(OptimizationError::invalid_argument(format!(
                "population size must be a positive even number, got {}",
                size
            )));
        }

        (0..size)
            .map(|_| self.sample(rng).map(Candidate::new))
            .collect::<Result<Vec<_>, _>>()
            .map(Population::new)
    }
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self {
            specs: vec![
                ParameterSpec::int("bollinger-period", 10, 30),
                ParameterSpec::float("bollinger-multiplier", 1.8, 2.9),
            ],
        }
    }
}
