//! Backtest engine configuration.
//!
//! Describes the external program run once per fitness evaluation and the engine
//! settings handed to it alongside the candidate's parameters.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Backtest executable, resolved through `PATH` when not absolute.
    pub program: String,
    pub args: Vec<String>,
    /// Name of the result statistic used as fitness.
    pub statistic: String,
    /// Parent directory for per-evaluation scratch directories. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
    /// Engine settings passed with every run. Parameter values take precedence on key clashes.
    pub settings: BTreeMap<String, String>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        let settings = [
            ("environment", "backtesting"),
            ("algorithm-type-name", "BitfinexSuperTrend"),
            ("algorithm-language", "CSharp"),
            ("algorithm-location", "Optimization.exe"),
            ("job-queue-handler", "QuantConnect.Queues.JobQueue"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            program: String::new(),
            args: Vec::new(),
            statistic: "Sharpe Ratio".to_string(),
            work_dir: None,
            settings,
        }
    }
}

impl BacktestConfig {
    pub fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(program) = lookup("BACKTEST_PROGRAM") {
            self.program = program;
        }
        if let Some(statistic) = lookup("BACKTEST_STATISTIC") {
            self.statistic = statistic;
        }
        if let Some(dir) = lookup("BACKTEST_WORK_DIR") {
            self.work_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            bail!("No backtest program configured (set [backtest].program or BACKTEST_PROGRAM)");
        }
        if self.statistic.trim().is_empty() {
            bail!("Backtest statistic name must not be empty");
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requires_program() {
        let config = BacktestConfig::default();
        assert!(config.validate().is_err());
        assert_eq!(config.statistic, "Sharpe Ratio");
        assert_eq!(config.settings["environment"], "backtesting");
    }

    #[test]
    fn test_env_sets_program() {
        let mut config = BacktestConfig::default();
        config
            .apply_env(&|key: &str| match key {
                "BACKTEST_PROGRAM" => Some("/usr/local/bin/lean-backtest".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.program, "/usr/local/bin/lean-backtest");
        assert!(config.validate().is_ok());
    }
}
