//! Scheduler configuration structures.

use std::collections::HashSet;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "FLEET_SCHEDULER_CONFIG";

/// Executor selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// Tokio blocking pool of the runtime the scheduler is built in.
    Tokio,
    /// Dedicated OS worker threads.
    ThreadPool {
        /// Number of workers; defaults to the number of CPUs.
        #[serde(default)]
        worker_count: Option<usize>,
    },
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::ThreadPool { worker_count: None }
    }
}

/// A single-vehicle block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Block name.
    pub name: String,
    /// Names of the member resources.
    pub resources: Vec<String>,
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Executor running allocator tasks.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Tracing filter directive, e.g. `fleet_scheduler=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Size of the in-memory audit buffer; no audit trail when absent.
    #[serde(default)]
    pub audit_capacity: Option<usize>,
    /// Single-vehicle blocks enforced by the built-in block module.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

impl ExecutorConfig {
    /// Validate executor configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if let Self::ThreadPool {
            worker_count: Some(0),
        } = self
        {
            return Err("worker_count must be greater than 0".into());
        }
        Ok(())
    }
}

impl BlockConfig {
    /// Validate a block definition.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("block name must not be empty".into());
        }
        if self.resources.is_empty() {
            return Err(format!("block `{}` has no resources", self.name));
        }
        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate executor, audit and block settings.
    pub fn validate(&self) -> Result<(), String> {
        self.executor
            .validate()
            .map_err(|e| format!("executor invalid: {e}"))?;
        if self.audit_capacity == Some(0) {
            return Err("audit_capacity must be greater than 0".into());
        }
        let mut names = HashSet::new();
        for block in &self.blocks {
            block.validate()?;
            if !names.insert(block.name.as_str()) {
                return Err(format!("duplicate block `{}`", block.name));
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the file named by `FLEET_SCHEDULER_CONFIG`,
    /// reading `.env` first. Defaults apply when the variable is unset.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the configuration is invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading scheduler config from {path}"))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid scheduler config in {path}"))
    }
}
