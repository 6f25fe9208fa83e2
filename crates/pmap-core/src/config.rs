//! Loader configuration.
//!
//! Controls how strictly a mapping is validated when a snapshot is built.
//! Read from a TOML file, every field optional:
//!
//! ```toml
//! validation = "quarantine"
//! overlapping_overrides = "reject"
//! validate_pin_wiring = true
//! max_logged_issues = 32
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// What to do with a mapping that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject the whole mapping (default).
    #[default]
    Strict,
    /// Load everything except the offending (port, profile) entries.
    Quarantine,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMode::Strict => write!(f, "strict"),
            ValidationMode::Quarantine => write!(f, "quarantine"),
        }
    }
}

impl FromStr for ValidationMode {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "quarantine" => Ok(ValidationMode::Quarantine),
            _ => Err(MappingError::config(format!("unknown validation mode '{}'", s))),
        }
    }
}

/// Handling of override rules that write the same key for the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Accept silently; the later rule wins.
    Allow,
    /// Log a warning; the later rule wins (default).
    #[default]
    Warn,
    /// Treat the overlap as a validation issue.
    Reject,
}

impl OverlapPolicy {
    pub const fn is_reject(&self) -> bool {
        matches!(self, OverlapPolicy::Reject)
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Allow => write!(f, "allow"),
            OverlapPolicy::Warn => write!(f, "warn"),
            OverlapPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Snapshot loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Strict or quarantine validation
    #[serde(default)]
    pub validation: ValidationMode,

    /// Overlapping override rule policy
    #[serde(default)]
    pub overlapping_overrides: OverlapPolicy,

    /// Check that profile pins belong to the port's lane topology
    #[serde(default = "default_validate_pin_wiring")]
    pub validate_pin_wiring: bool,

    /// Cap on issues logged individually during a quarantine load
    #[serde(default = "default_max_logged_issues")]
    pub max_logged_issues: usize,
}

fn default_validate_pin_wiring() -> bool {
    true
}

fn default_max_logged_issues() -> usize {
    32
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::default(),
            overlapping_overrides: OverlapPolicy::default(),
            validate_pin_wiring: default_validate_pin_wiring(),
            max_logged_issues: default_max_logged_issues(),
        }
    }
}

impl LoaderConfig {
    /// Strict validation with every other setting at its default.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Quarantine validation with every other setting at its default.
    pub fn quarantine() -> Self {
        Self {
            validation: ValidationMode::Quarantine,
            ..Self::default()
        }
    }

    /// Sets the overlap policy.
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlapping_overrides = policy;
        self
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: LoaderConfig = toml::from_str(s)
            .map_err(|e| MappingError::config(format!("failed to parse loader config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MappingError::config(format!("failed to serialize loader config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_logged_issues == 0 {
            return Err(MappingError::config("max_logged_issues must be > 0"));
        }
        // Quarantine needs the wiring checks to know which entries to drop.
        if self.validation == ValidationMode::Quarantine && !self.validate_pin_wiring {
            return Err(MappingError::config(
                "quarantine validation requires validate_pin_wiring = true",
            ));
        }
        Ok(())
    }
}
