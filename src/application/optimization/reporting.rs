//! Reporting utilities for genetic search runs.
//!
//! Provides the per-generation record, the run outcome, formatted console output and
//! JSON export.

use crate::domain::optimization::{Candidate, ParameterSet, ParameterSpace, ParameterSpec};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Summary of one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub best_fitness: f64,
    pub best_parameters: ParameterSet,
    /// Score of a confirmation run of the best candidate, when enabled and successful.
    pub aggregate_score: Option<f64>,
    pub evaluations: u64,
    pub cache_hits: u64,
    pub failures: u64,
    /// Successful operator applications so far, across all operators.
    pub operator_invocations: u64,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub run_id: Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_evaluations: u64,
    pub generations: Vec<GenerationReport>,
    /// Fittest candidate seen in any generation.
    pub best: Option<Candidate>,
}

/// Reporter for search results output.
pub struct SearchReporter {
    output_dir: String,
}

impl SearchReporter {
    /// Creates a new reporter with the given output directory.
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Prints the header banner for the run.
    pub fn print_header(
        &self,
        population_size: usize,
        max_generations: usize,
        seed: Option<u64>,
        output: &str,
    ) {
        println!("{}", "=".repeat(80));
        println!("🧬 GENETIC PARAMETER OPTIMIZER");
        println!("{}", "=".repeat(80));
        println!("Population:   {}", population_size);
        println!("Generations:  {}", max_generations);
        match seed {
            Some(seed) => println!("Seed:         {}", seed),
            None => println!("Seed:         random"),
        }
        println!("Output:       {}", output);
        println!("{}", "=".repeat(80));
    }

    /// Prints the parameter bounds being searched.
    pub fn print_space_info(&self, space: &ParameterSpace) {
        println!("\n📊 Parameter Space:");
        for spec in space.specs() {
            match spec {
                ParameterSpec::Int { name, min, max } => {
                    println!("  {:<24} int   [{}, {})", name, min, max)
                }
                ParameterSpec::Float { name, min, max } => {
                    println!("  {:<24} float [{}, {})", name, min, max)
                }
            }
        }
    }

    pub fn print_table_header(&self) {
        println!(
            "\n{:<5} | {:>12} | {:>12} | {:>6} | {:>6} | {:>6} | Parameters",
            "Gen", "Fitness", "Sharpe", "Evals", "Cached", "Failed"
        );
        println!("{}", "-".repeat(80));
    }

    /// Prints one row per completed generation.
    pub fn print_generation(&self, report: &GenerationReport) {
        let aggregate = report
            .aggregate_score
            .map(|score| format!("{:.4}", score))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<5} | {:>12.4} | {:>12} | {:>6} | {:>6} | {:>6} | {}",
            report.generation,
            report.best_fitness,
            aggregate,
            report.evaluations,
            report.cache_hits,
            report.failures,
            report.best_parameters
        );
    }

    /// Prints the best configuration of the run.
    pub fn print_best(&self, outcome: &SearchOutcome) {
        println!("\n{}", "=".repeat(80));
        let Some(best) = &outcome.best else {
            println!("⚠️  No candidate was evaluated.");
            println!("{}\n", "=".repeat(80));
            return;
        };

        println!("🏆 BEST CONFIGURATION:");
        for (key, value) in best.params.iter() {
            println!("  {:<24} {}", key, value);
        }
        if let Some(fitness) = best.fitness {
            println!("\n  Fitness:          {:.4}", fitness);
        }
        println!("  Evaluations:      {}", outcome.total_evaluations);
        println!("  Seed:             {}", outcome.seed);
        println!("  Run:              {}", outcome.run_id);
        println!("{}\n", "=".repeat(80));
    }

    /// Exports the outcome to a JSON file.
    pub fn export_json(&self, outcome: &SearchOutcome, filename: &str) -> Result<String> {
        let output_path = if filename.contains('/') || filename.contains('\\') {
            filename.to_string()
        } else {
            format!("{}/{}", self.output_dir, filename)
        };

        if let Some(parent) = Path::new(&output_path).parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        let json_output =
            serde_json::to_string_pretty(outcome).context("Failed to serialize outcome to JSON")?;

        std::fs::write(&output_path, json_output)
            .context(format!("Failed to write results to {}", output_path))?;

        println!("💾 Results saved to: {}", output_path);
        Ok(output_path)
    }
}

impl Default for SearchReporter {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> SearchOutcome {
        let params = ParameterSet::builder()
            .with("bollinger-period", 14)
            .with("bollinger-multiplier", 2.25)
            .build()
            .unwrap();
        SearchOutcome {
            run_id: Uuid::new_v4(),
            seed: 42,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total_evaluations: 8,
            generations: vec![GenerationReport {
                generation: 1,
                best_fitness: 1.75,
                best_parameters: params.clone(),
                aggregate_score: None,
                evaluations: 8,
                cache_hits: 0,
                failures: 0,
                operator_invocations: 1,
            }],
            best: Some(Candidate::with_fitness(params, 1.75)),
        }
    }

    #[test]
    fn test_export_json_writes_outcome() {
        let dir = std::env::temp_dir().join(format!("optimizer_report_{}", Uuid::new_v4()));
        let reporter = SearchReporter::new(dir.to_str().unwrap());

        let path = reporter.export_json(&outcome(), "run.json").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(json["seed"], 42);
        assert_eq!(json["best"]["params"]["bollinger-period"], 14);
        assert_eq!(json["generations"][0]["best_fitness"], 1.75);
        assert!(json["generations"][0]["aggregate_score"].is_null());

        std::fs::remove_dir_all(dir).ok();
    }
}
