//! Error types for platform mapping operations.
//!
//! One error type covers both halves of the engine: problems with the
//! static mapping data (detected at load time wherever possible) and bad
//! runtime requests (unknown port, unsupported profile). Callers decide the
//! recovery policy; nothing in this crate retries.

use std::fmt;
use std::io;
use std::path::PathBuf;

use pmap_types::{PortId, ProfileId};
use thiserror::Error;

/// Result type alias for platform mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;

/// A single problem found while validating mapping data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Port the issue is scoped to, if any.
    pub port: Option<PortId>,
    /// Profile the issue is scoped to, if any.
    pub profile: Option<ProfileId>,
    /// Human readable description.
    pub message: String,
}

impl ConfigIssue {
    /// Creates an issue that is not scoped to any port.
    pub fn global(message: impl Into<String>) -> Self {
        Self {
            port: None,
            profile: None,
            message: message.into(),
        }
    }

    /// Creates an issue scoped to a port.
    pub fn port(port: PortId, message: impl Into<String>) -> Self {
        Self {
            port: Some(port),
            profile: None,
            message: message.into(),
        }
    }

    /// Creates an issue scoped to one (port, profile) entry.
    pub fn entry(port: PortId, profile: ProfileId, message: impl Into<String>) -> Self {
        Self {
            port: Some(port),
            profile: Some(profile),
            message: message.into(),
        }
    }

    /// Returns the (port, profile) entry this issue poisons, if it is
    /// narrow enough to quarantine.
    pub fn entry_key(&self) -> Option<(PortId, ProfileId)> {
        match (self.port, self.profile) {
            (Some(port), Some(profile)) => Some((port, profile)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.port, self.profile) {
            (Some(port), Some(profile)) => {
                write!(f, "port {} profile {}: {}", port, profile, self.message)
            }
            (Some(port), None) => write!(f, "port {}: {}", port, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Errors that can occur while loading or resolving a platform mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A chip name is not in the chip registry.
    #[error("Unknown chip '{name}'")]
    UnknownChip { name: String },

    /// A port id is not in the mapping.
    #[error("Unknown port {port}")]
    UnknownPort { port: PortId },

    /// A port name is not in the mapping.
    #[error("Unknown port name '{name}'")]
    UnknownPortName { name: String },

    /// A profile id is not in the profile catalog.
    #[error("Unknown profile {profile}")]
    UnknownProfile { profile: ProfileId },

    /// The port's wiring does not support the requested profile.
    #[error("Profile {profile} is not supported on port {port}")]
    UnsupportedProfileForPort { port: PortId, profile: ProfileId },

    /// The mapping data for one entry is internally inconsistent.
    #[error("Inconsistent mapping for port {port} profile {profile}: {message}")]
    ConfigInconsistency {
        port: PortId,
        profile: ProfileId,
        message: String,
    },

    /// Load-time validation rejected the mapping.
    #[error("Invalid platform mapping ({} issue(s)){}", .issues.len(), first_issue(.issues))]
    InvalidMapping { issues: Vec<ConfigIssue> },

    /// Two mapping fragments cannot be merged.
    #[error("Cannot merge profile {profile}: {message}")]
    MergeConflict { profile: ProfileId, message: String },

    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed mapping document.
    #[error("Failed to parse platform mapping: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid loader configuration.
    #[error("Invalid loader configuration: {message}")]
    Config { message: String },
}

fn first_issue(issues: &[ConfigIssue]) -> String {
    match issues.first() {
        Some(issue) => format!(": {}", issue),
        None => String::new(),
    }
}

impl MappingError {
    /// Creates a config inconsistency error.
    pub fn inconsistency(port: PortId, profile: ProfileId, message: impl Into<String>) -> Self {
        Self::ConfigInconsistency {
            port,
            profile,
            message: message.into(),
        }
    }

    /// Creates a loader configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates bad static mapping data rather
    /// than a bad request.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MappingError::ConfigInconsistency { .. }
                | MappingError::InvalidMapping { .. }
                | MappingError::MergeConflict { .. }
                | MappingError::Parse(_)
                | MappingError::UnknownChip { .. }
        )
    }

    /// Returns the validation issues carried by this error.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            MappingError::InvalidMapping { issues } => issues,
            _ => &[],
        }
    }
}
