// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::{StorageError, StorageErrorKind};
use storage_types::{StorageType, UnknownTypeName};
use thiserror::Error;

/// Errors from storage configuration and provisioning
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The (physical, logical, encryption) triple has no setup scenario
    #[error("Unsupported storage layout: {0}")]
    UnsupportedLayout(StorageType),

    #[error("Cannot set {what} while {layer} storage is {current}")]
    TypeMismatch {
        what: &'static str,
        layer: &'static str,
        current: &'static str,
    },

    #[error("Expected {expected} {what}, got {got}")]
    DeviceCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid storage configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    UnknownTypeName(#[from] UnknownTypeName),

    #[error("Storage device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Unable to unlock crypto storage (wrong password?)")]
    WrongPassword,

    #[error(transparent)]
    Storage(StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProvisionError {
    /// Configuration and programming errors, as opposed to runtime failures
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLayout(_)
                | Self::TypeMismatch { .. }
                | Self::DeviceCount { .. }
                | Self::InvalidConfiguration(_)
                | Self::UnknownTypeName(_)
        )
    }
}

impl From<StorageError> for ProvisionError {
    fn from(err: StorageError) -> Self {
        match err.kind {
            StorageErrorKind::InvalidPassphrase => ProvisionError::WrongPassword,
            _ => ProvisionError::Storage(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
