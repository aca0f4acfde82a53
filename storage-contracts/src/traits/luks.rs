// SPDX-License-Identifier: GPL-3.0-only

use crate::StorageError;

pub trait LuksOpsAdapter: Send + Sync {
    /// Whether `device` carries a LUKS header
    fn is_luks(&self, device: &str) -> Result<bool, StorageError>;

    fn format_luks(&self, device: &str, passphrase: &str) -> Result<(), StorageError>;

    /// Open `device` as /dev/mapper/`name`, returning the mapped path.
    ///
    /// A rejected passphrase is reported as
    /// [`StorageErrorKind::InvalidPassphrase`](crate::StorageErrorKind::InvalidPassphrase).
    fn open_luks(&self, device: &str, name: &str, passphrase: &str)
    -> Result<String, StorageError>;

    fn close_luks(&self, name: &str) -> Result<(), StorageError>;

    /// Whether a mapping called `name` is currently active
    fn is_luks_active(&self, name: &str) -> Result<bool, StorageError>;
}
