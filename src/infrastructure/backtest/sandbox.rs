use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scratch directory owned by a single backtest run.
///
/// The directory is removed when the sandbox is dropped, whichever way the evaluation
/// ended (success, error, or cancellation by timeout).
#[derive(Debug)]
pub struct EvaluationSandbox {
    id: Uuid,
    path: PathBuf,
}

impl EvaluationSandbox {
    pub fn create(root: &Path) -> Result<Self> {
        let id = Uuid::new_v4();
        let path = root.join(format!("backtest-{}", id.simple()));
        fs::create_dir_all(&path)
            .context(format!("Failed to create sandbox directory: {}", path.display()))?;
        debug!(sandbox = %id, "Sandbox created");
        Ok(Self { id, path })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EvaluationSandbox {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(sandbox = %self.id, "Failed to remove sandbox {}: {}", self.path.display(), e);
        }
    }
}
