//! Cross-platform application paths

use std::fs;
use std::path::PathBuf;

use crate::error::{HarnessError, Result};

const APP_DIR: &str = "light_dip_harness";

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Resolves the per-user data directory and makes sure it exists.
    pub fn new() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| HarnessError::Paths("Could not determine data directory".into()))?;
        Self::at(base.join(APP_DIR))
    }

    /// Uses an explicit directory instead of the OS data directory.
    pub fn at(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).map_err(|e| {
            HarnessError::Paths(format!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("harness.log")
    }
}
