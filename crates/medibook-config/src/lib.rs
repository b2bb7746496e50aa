//! Runtime configuration for the lifecycle core.
//!
//! Settings load from an optional TOML file plus `MEDIBOOK_*` environment
//! overrides, with compiled-in defaults. The file is looked up as
//! `medibook.toml` unless an explicit path is given.
//!
//! ```toml
//! [lifecycle]
//! prescribable_statuses = ["Completed"]
//!
//! [feedback]
//! require_prior_appointment = false
//!
//! [store]
//! timeout_ms = 5000
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medibook_core::AppointmentStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Lifecycle engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Appointment statuses from which a prescription may be created.
    ///
    /// The canonical rule is `Completed` only; deployments following the
    /// alternate workflow add `Approved` explicitly. Never both silently.
    pub prescribable_statuses: Vec<AppointmentStatus>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            prescribable_statuses: vec![AppointmentStatus::Completed],
        }
    }
}

impl LifecycleConfig {
    pub fn is_prescribable(&self, status: AppointmentStatus) -> bool {
        self.prescribable_statuses.contains(&status)
    }
}

/// Feedback guard settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// When true, feedback requires at least one appointment between the
    /// patient and the doctor. The baseline rule is loose.
    pub require_prior_appointment: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            require_prior_appointment: false,
        }
    }
}

/// Store call bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on any single store call, in milliseconds. Exceeding it
    /// surfaces as a retryable `Unavailable` error.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MedibookConfig {
    pub lifecycle: LifecycleConfig,
    pub feedback: FeedbackConfig,
    pub store: StoreConfig,
}

impl MedibookConfig {
    /// Loads `medibook.toml` from the working directory (if present) with
    /// `MEDIBOOK_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("medibook.toml")
    }

    /// Loads a specific TOML file (optional) with environment overrides.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("MEDIBOOK").separator("__"))
            .build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.prescribable_statuses.is_empty() {
            return Err(ConfigError::Invalid {
                message: "lifecycle.prescribable_statuses must not be empty".to_string(),
            });
        }
        if self
            .lifecycle
            .prescribable_statuses
            .iter()
            .any(|s| matches!(s, AppointmentStatus::Cancelled | AppointmentStatus::Rejected))
        {
            return Err(ConfigError::Invalid {
                message: "cancelled or rejected appointments can never be prescribable"
                    .to_string(),
            });
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "store.timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = MedibookConfig::default();
        assert_eq!(
            cfg.lifecycle.prescribable_statuses,
            vec![AppointmentStatus::Completed]
        );
        assert!(!cfg.feedback.require_prior_appointment);
        assert_eq!(cfg.store.timeout_ms, 5000);
        assert!(cfg.lifecycle.is_prescribable(AppointmentStatus::Completed));
        assert!(!cfg.lifecycle.is_prescribable(AppointmentStatus::Approved));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = MedibookConfig::load_from("/nonexistent/medibook.toml").unwrap();
        assert_eq!(cfg, MedibookConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[lifecycle]
prescribable_statuses = ["Completed", "Approved"]

[feedback]
require_prior_appointment = true

[store]
timeout_ms = 250
"#
        )
        .unwrap();

        let cfg = MedibookConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert!(cfg.lifecycle.is_prescribable(AppointmentStatus::Approved));
        assert!(cfg.feedback.require_prior_appointment);
        assert_eq!(cfg.store.timeout(), std::time::Duration::from_millis(250));
    }

    #[test]
    fn test_empty_prescribable_set_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[lifecycle]\nprescribable_statuses = []").unwrap();

        let err = MedibookConfig::load_from(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_terminal_failure_statuses_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[lifecycle]\nprescribable_statuses = [\"Cancelled\"]"
        )
        .unwrap();

        let err = MedibookConfig::load_from(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[store]\ntimeout_ms = 0").unwrap();

        let err = MedibookConfig::load_from(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
