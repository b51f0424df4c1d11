//! Error types for jasm
//!
//! Every failure here happens during initialization. Steady-state logging
//! never produces an error value.

use std::path::PathBuf;

/// Main error type for jasm log setup
#[derive(Debug, thiserror::Error)]
pub enum JasmError {
    // === Directory Errors ===

    #[error("Could not determine the user's home directory")]
    HomeDirNotFound,

    #[error("Failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Log File Errors ===

    #[error("open logFile {path}: {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("open clients logFile {path}: {source}")]
    OpenClientLog {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Tracing Errors ===

    #[error("Failed to init tracing: {0}")]
    Tracing(String),
}

impl JasmError {
    /// Create a tracing bridge error
    pub fn tracing(msg: impl Into<String>) -> Self {
        Self::Tracing(msg.into())
    }

    /// Path involved in the failure, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::CreateDir { path, .. }
            | Self::OpenLog { path, .. }
            | Self::OpenClientLog { path, .. } => Some(path),
            Self::HomeDirNotFound | Self::Tracing(_) => None,
        }
    }
}

/// Result type alias using JasmError
pub type Result<T> = std::result::Result<T, JasmError>;
