//! # Registry Configuration
//!
//! Loaded from a YAML document, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `TAXREG_SUPER_ADMIN` | `initial_super_admin` |
//! | `TAXREG_JOURNAL_CAPACITY` | `journal_capacity` |
//!
//! ```yaml
//! initial_super_admin: "0x00000000000000000000000000000000000000a1"
//! journal_capacity: 5000
//! trace_events: false
//! ```
//!
//! `logic` defaults to the built-in revision and is rarely set by hand.

use std::path::Path;

use serde::{Deserialize, Serialize};

use taxreg_core::Address;
use taxreg_state::{IncompatibleTarget, LogicDescriptor};

/// Environment variable overriding `initial_super_admin`.
pub const ENV_SUPER_ADMIN: &str = "TAXREG_SUPER_ADMIN";
/// Environment variable overriding `journal_capacity`.
pub const ENV_JOURNAL_CAPACITY: &str = "TAXREG_JOURNAL_CAPACITY";

/// Default number of events retained by the journal.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// Errors loading or validating a [`RegistryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found at the given path.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// IO error reading the config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document could not be parsed.
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    /// The initial super-admin is the null address.
    #[error("initial_super_admin must be a non-zero address")]
    ZeroSuperAdmin,

    /// The event journal would retain nothing.
    #[error("journal_capacity must be positive")]
    ZeroJournalCapacity,

    /// The configured logic exposes no compatible migration entry point.
    #[error("configured logic is incompatible: {0}")]
    IncompatibleLogic(#[from] IncompatibleTarget),
}

fn default_journal_capacity() -> usize {
    DEFAULT_JOURNAL_CAPACITY
}

fn default_trace_events() -> bool {
    true
}

/// Configuration of a [`crate::TaxRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The single Super-Admin set at creation.
    #[serde(default)]
    pub initial_super_admin: Address,
    /// Events retained by the in-memory journal.
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
    /// Whether events are republished through `tracing`.
    #[serde(default = "default_trace_events")]
    pub trace_events: bool,
    /// The logic revision this process runs.
    #[serde(default)]
    pub logic: LogicDescriptor,
}

impl RegistryConfig {
    /// Defaults with the given initial Super-Admin.
    pub fn new(initial_super_admin: Address) -> Self {
        Self {
            initial_super_admin,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            trace_events: true,
            logic: LogicDescriptor::builtin(),
        }
    }

    /// Parse a YAML document. Does not validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file. Does not validate.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Read a YAML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_path(path)?.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_SUPER_ADMIN) {
            self.initial_super_admin =
                Address::parse(value.trim()).map_err(|e| ConfigError::InvalidEnv {
                    var: ENV_SUPER_ADMIN,
                    reason: e.to_string(),
                })?;
        }
        if let Some(value) = lookup(ENV_JOURNAL_CAPACITY) {
            self.journal_capacity =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                        var: ENV_JOURNAL_CAPACITY,
                        reason: e.to_string(),
                    })?;
        }
        Ok(self)
    }

    /// Reject configurations the registry cannot start from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_super_admin.is_zero() {
            return Err(ConfigError::ZeroSuperAdmin);
        }
        if self.journal_capacity == 0 {
            return Err(ConfigError::ZeroJournalCapacity);
        }
        self.logic.check_migration_entry()?;
        Ok(())
    }
}
