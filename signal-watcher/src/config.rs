//! Scheduler configuration.
//!
//! ```rust,ignore
//! let config = SchedulerConfig::from_json(r#"{ "max_passes": 8 }"#)?;
//! let scheduler = UpdateScheduler::new(config)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_max_passes() -> usize {
    64
}

/// Settings for [`UpdateScheduler`](crate::element::UpdateScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Upper bound on queue passes per flush.
    ///
    /// An element whose render keeps invalidating itself is re-queued every
    /// pass; the bound turns that into a reported condition instead of a hang.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(Error::Config("max_passes must be at least 1".into()));
        }
        Ok(())
    }
}
