// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::{StorageError, StorageErrorKind};
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Required tool not installed: {0}")]
    ToolMissing(String),

    #[error("{command} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{command} failed, device busy: {stderr}")]
    Busy { command: String, stderr: String },

    #[error("{command} failed, already exists: {stderr}")]
    AlreadyExists { command: String, stderr: String },

    #[error("Lost child process while running {0}")]
    ChildLost(String),

    #[error("Wrong passphrase for {0}")]
    InvalidPassphrase(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;

impl From<SysError> for StorageError {
    fn from(err: SysError) -> Self {
        let kind = match &err {
            SysError::PermissionDenied(_) => StorageErrorKind::PermissionDenied,
            SysError::DeviceNotFound(_) => StorageErrorKind::NotFound,
            SysError::ToolMissing(_) => StorageErrorKind::Unsupported,
            SysError::Busy { .. } => StorageErrorKind::Busy,
            SysError::AlreadyExists { .. } => StorageErrorKind::Conflict,
            SysError::ChildLost(_) => StorageErrorKind::ChildLost,
            SysError::InvalidPassphrase(_) => StorageErrorKind::InvalidPassphrase,
            SysError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StorageErrorKind::NotFound
            }
            _ => StorageErrorKind::Internal,
        };
        StorageError::new(kind, err.to_string())
    }
}
