//! Plugin runtime error types

use crate::loader::ModuleKind;
use std::fmt;
use std::path::PathBuf;

/// Failure to turn a file on disk into a live capability
///
/// Load errors are recoverable: callers log them and keep serving whatever
/// was loaded before.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The OS could not map the image (bad path, bad format, missing dependencies)
    #[error("Failed to open module {}: {reason}", .path.display())]
    OpenFailed {
        /// Module path
        path: PathBuf,
        /// Loader diagnostic
        reason: String,
    },

    /// The image does not export the factory for the requested tier
    #[error("Symbol `{symbol}` not found in {}", .path.display())]
    SymbolNotFound {
        /// Module path
        path: PathBuf,
        /// Factory symbol name
        symbol: &'static str,
    },

    /// The image produced a capability of a different tier
    #[error("Module {} has the wrong tier, expected {expected}", .path.display())]
    KindMismatch {
        /// Module path
        path: PathBuf,
        /// Tier that was requested
        expected: ModuleKind,
    },
}

impl LoadError {
    /// Path of the module that failed to load
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::OpenFailed { path, .. }
            | Self::SymbolNotFound { path, .. }
            | Self::KindMismatch { path, .. } => path,
        }
    }

    /// Create an open failure
    pub fn open_failed(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Plugin runtime error type
#[derive(Debug, thiserror::Error)]
pub enum PluginRuntimeError {
    /// Module load error
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result type for plugin runtime operations
pub type Result<T> = std::result::Result<T, PluginRuntimeError>;

impl PluginRuntimeError {
    /// Create a new invalid state error
    pub fn invalid_state(msg: impl fmt::Display) -> Self {
        Self::InvalidState(msg.to_string())
    }

    /// Create a new config error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Create a new other error
    pub fn other(msg: impl fmt::Display) -> Self {
        Self::Other(msg.to_string())
    }
}

impl From<PluginRuntimeError> for hydra_core::Error {
    fn from(err: PluginRuntimeError) -> Self {
        match err {
            PluginRuntimeError::Load(load) => {
                hydra_core::Error::module(load.path().display().to_string(), load.to_string())
            }
            PluginRuntimeError::ConfigError(msg) => hydra_core::Error::Config(msg),
            PluginRuntimeError::IoError(e) => hydra_core::Error::Io(e),
            other => hydra_core::Error::Runtime(other.to_string()),
        }
    }
}
