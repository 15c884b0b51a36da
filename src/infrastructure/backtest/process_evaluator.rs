//! Fitness evaluation through an external backtest program.
//!
//! Every evaluation runs the configured program as a fresh child process inside its own
//! [`EvaluationSandbox`]. The engine configuration (settings plus parameter values, all as
//! text) is written to `config.json` in the sandbox and piped to the child's stdin. The
//! child reports its statistics as a JSON object on stdout; the last such line wins.

use crate::config::BacktestConfig;
use crate::domain::optimization::ParameterSet;
use crate::domain::ports::FitnessEvaluator;
use crate::infrastructure::backtest::sandbox::EvaluationSandbox;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use std::process::Stdio;
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ProcessBacktestEvaluator {
    config: BacktestConfig,
}

impl ProcessBacktestEvaluator {
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration for one run: static settings overlaid with the parameters.
    pub fn engine_config(&self, params: &ParameterSet) -> Map<String, Value> {
        let mut document: Map<String, Value> = self
            .config
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        for (key, value) in params.iter() {
            document.insert(key.to_string(), Value::String(value.to_string()));
        }
        document
    }
}

#[async_trait]
impl FitnessEvaluator for ProcessBacktestEvaluator {
    async fn evaluate(&self, params: &ParameterSet) -> Result<f64> {
        let sandbox = EvaluationSandbox::create(&self.config.work_dir())?;
        let payload = serde_json::to_vec_pretty(&self.engine_config(params))
            .context("Failed to serialize engine configuration")?;
        let config_path = sandbox.path().join("config.json");
        tokio::fs::write(&config_path, &payload)
            .await
            .context("Failed to write engine configuration")?;

        debug!(sandbox = %sandbox.id(), params = %params, "Launching backtest");

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .current_dir(sandbox.path())
            .env("BACKTEST_CONFIG", &config_path)
            .env("BACKTEST_RUN_ID", sandbox.id().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context(format!("Failed to launch backtest program {}", self.config.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that never reads its stdin may close it early.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!(sandbox = %sandbox.id(), "Backtest closed stdin early: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for backtest program")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            bail!(
                "Backtest exited with {}: {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_statistic(&stdout, &self.config.statistic)
    }
}

/// Extracts `statistic` from the last JSON object printed on `stdout`.
///
/// The statistic is looked up under `"statistics"` first, then at the top level. String
/// values are parsed as decimals; a value that isn't a number counts as zero.
pub fn parse_statistic(stdout: &str, statistic: &str) -> Result<f64> {
    let report = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| {
            serde_json::from_str::<Value>(line)
                .ok()
                .filter(Value::is_object)
        })
        .ok_or_else(|| anyhow!("Backtest produced no JSON result"))?;

    let value = report
        .get("statistics")
        .and_then(|stats| stats.get(statistic))
        .or_else(|| report.get(statistic))
        .ok_or_else(|| anyhow!("Statistic '{}' missing from backtest result", statistic))?;

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Decimal::from_str(s.trim()).ok().and_then(|d| d.to_f64()),
        _ => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        warn!("Unable to parse statistic '{}' ({}), using 0", statistic, value);
        0.0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::builder()
            .with("bollinger-period", 20)
            .with("bollinger-multiplier", 2.5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_statistic_from_nested_strings() {
        let stdout = "loading data...\n{\"statistics\": {\"Sharpe Ratio\": \"1.372\"}}\n";
        assert_eq!(parse_statistic(stdout, "Sharpe Ratio").unwrap(), 1.372);
    }

    #[test]
    fn test_parse_statistic_uses_last_json_line() {
        let stdout = "{\"Sharpe Ratio\": 0.5}\nprogress 100%\n{\"Sharpe Ratio\": -0.25}";
        assert_eq!(parse_statistic(stdout, "Sharpe Ratio").unwrap(), -0.25);
    }

    #[test]
    fn test_unparseable_statistic_is_zero() {
        let stdout = "{\"statistics\": {\"Sharpe Ratio\": \"n/a\"}}";
        assert_eq!(parse_statistic(stdout, "Sharpe Ratio").unwrap(), 0.0);
    }

    #[test]
    fn test_missing_result_is_an_error() {
        assert!(parse_statistic("engine crashed", "Sharpe Ratio").is_err());
        assert!(parse_statistic("{\"Total Trades\": 4}", "Sharpe Ratio").is_err());
    }

    #[test]
    fn test_engine_config_renders_parameters_as_text() {
        let mut config = BacktestConfig {
            program: "backtest".to_string(),
            ..BacktestConfig::default()
        };
        config
            .settings
            .insert("bollinger-period".to_string(), "99".to_string());
        let evaluator = ProcessBacktestEvaluator::new(config).unwrap();

        let document = evaluator.engine_config(&params());
        assert_eq!(document["bollinger-period"], "20");
        assert_eq!(document["bollinger-multiplier"], "2.5");
        assert_eq!(document["environment"], "backtesting");
    }

    #[test]
    fn test_missing_program_rejected() {
        assert!(ProcessBacktestEvaluator::new(BacktestConfig::default()).is_err());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::path::{Path, PathBuf};
        use uuid::Uuid;

        fn shell(script: &str, work_dir: &Path) -> ProcessBacktestEvaluator {
            ProcessBacktestEvaluator::new(BacktestConfig {
                program: "/bin/sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                work_dir: Some(work_dir.to_path_buf()),
                ..BacktestConfig::default()
            })
            .unwrap()
        }

        fn work_dir() -> PathBuf {
            let dir = std::env::temp_dir().join(format!("optimizer_process_{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn is_empty(dir: &Path) -> bool {
            std::fs::read_dir(dir).unwrap().next().is_none()
        }

        #[tokio::test]
        async fn test_reads_statistic_and_cleans_up() {
            let dir = work_dir();
            let evaluator = shell(
                r#"cat > /dev/null; test -f config.json || exit 3; echo '{"statistics": {"Sharpe Ratio": "2.05"}}'"#,
                &dir,
            );

            let fitness = evaluator.evaluate(&params()).await.unwrap();
            assert_eq!(fitness, 2.05);
            assert!(is_empty(&dir));
            std::fs::remove_dir_all(dir).ok();
        }

        #[tokio::test]
        async fn test_config_reaches_child_on_stdin() {
            let dir = work_dir();
            let evaluator = shell(
                r#"grep -q '"bollinger-period": "20"' && echo '{"Sharpe Ratio": 1}'"#,
                &dir,
            );

            let fitness = evaluator.evaluate(&params()).await.unwrap();
            assert_eq!(fitness, 1.0);
            std::fs::remove_dir_all(dir).ok();
        }

        #[tokio::test]
        async fn test_non_zero_exit_is_a_failure_and_cleans_up() {
            let dir = work_dir();
            let evaluator = shell("echo 'engine exploded' >&2; exit 2", &dir);

            let err = evaluator.evaluate(&params()).await.unwrap_err();
            assert!(err.to_string().contains("engine exploded"));
            assert!(is_empty(&dir));
            std::fs::remove_dir_all(dir).ok();
        }

        #[tokio::test]
        async fn test_cancelled_evaluation_cleans_up() {
            let dir = work_dir();
            let evaluator = shell("sleep 30", &dir);

            let result = tokio::time::timeout(
                std::time::Duration::from_millis(200),
                evaluator.evaluate(&params()),
            )
            .await;
            assert!(result.is_err());
            assert!(is_empty(&dir));
            std::fs::remove_dir_all(dir).ok();
        }
    }
}
