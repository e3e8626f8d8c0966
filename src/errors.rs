//! Error types for jail operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for jail operations
pub type Result<T> = std::result::Result<T, JailError>;

/// Errors that can occur while building or entering a jail
#[derive(Error, Debug)]
pub enum JailError {
    #[error("{} is not a valid directory", path.display())]
    InvalidWorkspace { path: PathBuf },

    #[error("no command specified")]
    NoCommand,

    /// Argument error already rendered by clap, usage text included
    #[error("{0}")]
    Usage(String),

    #[error("namespace creation failed: {0}")]
    NamespaceCreationFailed(String),

    #[error("{operation} {}: {source}", path.display())]
    MountSetupFailed {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{integration} not mounted: {reason}")]
    IntegrationMountFailed {
        integration: &'static str,
        reason: String,
    },

    #[error("finding command {name}: command not found in search path")]
    CommandNotFound { name: String },

    #[error("exec {}: {source}", path.display())]
    ExecFailed {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl JailError {
    pub(crate) fn mount(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: impl Into<io::Error>,
    ) -> Self {
        JailError::MountSetupFailed {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn integration(integration: &'static str, reason: impl ToString) -> Self {
        JailError::IntegrationMountFailed {
            integration,
            reason: reason.to_string(),
        }
    }
}
