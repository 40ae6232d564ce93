//! Typed errors for the subfilter library seams.
//!
//! Record sources, profile stores and the key parsers return
//! [`SubfilterError`]. The CLI and HTTP layers wrap these in `anyhow` with
//! additional context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the subfilter engine and its collaborators.
#[derive(Debug, Error)]
pub enum SubfilterError {
    #[error("unknown facet dimension: '{0}'")]
    UnknownDimension(String),

    #[error("unknown view: '{0}' (expected latest, charts, items, hosts or problems)")]
    UnknownView(String),

    #[error("unknown severity: '{0}'")]
    UnknownSeverity(String),

    #[error("unknown tag operator: '{0}'")]
    UnknownOperator(String),

    #[error("invalid tag condition '{0}': expected TAG:OPERATOR[:VALUE]")]
    InvalidTagCondition(String),

    #[error("invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown user kind: '{0}' (expected user, admin or super-admin)")]
    UnknownUserKind(String),

    #[error("user '{user}' is not allowed to open the {view} view")]
    AccessDenied { user: String, view: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, SubfilterError>;

impl SubfilterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
