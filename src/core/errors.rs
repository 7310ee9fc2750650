//! MSR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, MsrError>;

/// Top-level error type for the media scan router.
#[derive(Debug, Error)]
pub enum MsrError {
    #[error("[MSR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MSR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MSR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MSR-2001] could not canonicalize {path}: {source}")]
    Normalization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MSR-2002] unrecognized boot-scan preference value: {raw:?}")]
    PreferenceParse { raw: String },

    #[error("[MSR-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MSR-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MSR-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[MSR-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl MsrError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MSR-1001",
            Self::MissingConfig { .. } => "MSR-1002",
            Self::ConfigParse { .. } => "MSR-1003",
            Self::Normalization { .. } => "MSR-2001",
            Self::PreferenceParse { .. } => "MSR-2002",
            Self::Serialization { .. } => "MSR-2101",
            Self::Io { .. } => "MSR-3001",
            Self::ChannelClosed { .. } => "MSR-3002",
            Self::Runtime { .. } => "MSR-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Normalization failures are deliberately not retryable: the router
    /// drops the triggering event instead (best-effort semantics).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for normalization failures.
    #[must_use]
    pub fn normalization(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Normalization {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for MsrError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for MsrError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
