// SPDX-License-Identifier: GPL-3.0-only

//! LUKS containers via cryptsetup
//!
//! Passphrases are always passed on stdin (`--key-file=-`), never as
//! arguments.

use tracing::{debug, info};

use crate::cmd;
use crate::error::{Result, SysError};

// cryptsetup exit codes (see cryptsetup(8), RETURN CODES)
const EXIT_WRONG_PASSPHRASE: i32 = 2;
const EXIT_NO_DEVICE: i32 = 4;

fn require_cryptsetup() -> Result<()> {
    if !cfg!(feature = "luks-tools") {
        return Err(SysError::ToolMissing(
            "cryptsetup (luks-tools disabled)".to_string(),
        ));
    }
    cmd::require_tool("cryptsetup")
}

pub fn mapper_path(name: &str) -> String {
    format!("/dev/mapper/{name}")
}

/// Whether `device` carries a LUKS header
pub fn is_luks(device: &str) -> Result<bool> {
    require_cryptsetup()?;
    let outcome = cmd::run_unchecked("cryptsetup", &["isLuks", device])?;
    match outcome.code {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        Some(EXIT_NO_DEVICE) => Err(SysError::DeviceNotFound(device.to_string())),
        _ => outcome.checked().map(|_| false),
    }
}

pub fn format_luks(device: &str, passphrase: &str) -> Result<()> {
    require_cryptsetup()?;
    info!("Formatting LUKS container on {}", device);
    cmd::run_with_input_unchecked(
        "cryptsetup",
        &[
            "luksFormat",
            "--batch-mode",
            "--type",
            "luks2",
            "--key-file=-",
            device,
        ],
        passphrase.as_bytes(),
    )?
    .checked()?;
    Ok(())
}

/// Open `device` as `/dev/mapper/<name>` and return that path
pub fn open_luks(device: &str, name: &str, passphrase: &str) -> Result<String> {
    require_cryptsetup()?;
    info!("Opening LUKS container {} as {}", device, name);
    let outcome = cmd::run_with_input_unchecked(
        "cryptsetup",
        &["open", "--type", "luks", "--key-file=-", device, name],
        passphrase.as_bytes(),
    )?;

    if outcome.code == Some(EXIT_WRONG_PASSPHRASE) {
        debug!("cryptsetup rejected passphrase: {}", outcome.stderr.trim());
        return Err(SysError::InvalidPassphrase(device.to_string()));
    }
    outcome.checked()?;

    Ok(mapper_path(name))
}

pub fn close_luks(name: &str) -> Result<()> {
    require_cryptsetup()?;
    info!("Closing LUKS mapping {}", name);
    cmd::run("cryptsetup", &["close", name])?;
    Ok(())
}

pub fn is_luks_active(name: &str) -> Result<bool> {
    require_cryptsetup()?;
    let outcome = cmd::run_unchecked("cryptsetup", &["status", name])?;
    match outcome.code {
        Some(0) => Ok(true),
        Some(EXIT_NO_DEVICE) => Ok(false),
        _ => outcome.checked().map(|_| false),
    }
}
