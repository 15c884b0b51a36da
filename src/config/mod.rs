//! Configuration module for the optimizer.
//!
//! Configuration is layered: built-in defaults, then an optional TOML search file,
//! then environment variables (a `.env` file is loaded first when present). The CLI
//! applies its own flags on top.

mod backtest_config;
mod search_config;

pub use backtest_config::BacktestConfig;
pub use search_config::SearchConfig;

use crate::domain::optimization::{ParameterSpace, ParameterSpec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Complete optimizer configuration, mirroring the TOML file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub search: SearchConfig,
    /// Empty means the built-in Bollinger parameter space.
    pub parameters: Vec<ParameterSpec>,
    pub backtest: BacktestConfig,
}

impl OptimizerConfig {
    /// Loads defaults, the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&|key: &str| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read search config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .context(format!("Failed to parse search config TOML: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        self.search
            .apply_env(lookup)
            .context("Failed to load search config")?;
        self.backtest
            .apply_env(lookup)
            .context("Failed to load backtest config")?;
        Ok(())
    }

    /// Checks everything needed to start a run. Errors here abort startup.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.parameter_space()?;
        self.backtest.validate()?;
        Ok(())
    }

    pub fn parameter_space(&self) -> Result<ParameterSpace> {
        if self.parameters.is_empty() {
            return Ok(ParameterSpace::default());
        }
        ParameterSpace::new(self.parameters.clone()).context("Invalid parameter space")
    }
}

/// Reads and parses one variable; absent is `None`, unparseable is an error.
pub(crate) fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: {}", key, raw))
        })
        .transpose()
}
