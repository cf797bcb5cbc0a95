//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::core::SchedulerLimits;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum in-flight operations against the endpoint.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Worker count; defaults to `capacity` when absent.
    #[serde(default)]
    pub worker_count: Option<usize>,
}

fn default_capacity() -> usize {
    num_cpus::get().max(1) * 4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            worker_count: None,
        }
    }
}

impl SchedulerConfig {
    /// Config with an explicit capacity.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            worker_count: None,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.worker_count == Some(0) {
            return Err("worker_count must be greater than 0".into());
        }
        Ok(())
    }

    /// Limits handed to the scheduler.
    pub fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            capacity: self.capacity,
            worker_count: self.worker_count.unwrap_or(self.capacity),
        }
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
