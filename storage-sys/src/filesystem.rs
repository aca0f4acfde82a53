// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem creation, labels and mounts

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cmd;
use crate::error::{Result, SysError};

const MOUNTINFO: &str = "/proc/self/mountinfo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

pub fn format_filesystem(device: &str, fs_type: &str, label: &str) -> Result<()> {
    let tool = format!("mkfs.{fs_type}");
    cmd::require_tool(&tool)?;
    info!(
        "Creating {} filesystem labelled {:?} on {}",
        fs_type, label, device
    );

    let mut args = vec!["-F"];
    if !label.is_empty() {
        args.extend(["-L", label]);
    }
    args.push(device);
    cmd::run(&tool, &args)?;
    Ok(())
}

/// Volume label of the filesystem on `device`, `None` when it has no label
pub fn get_filesystem_label(device: &str) -> Result<Option<String>> {
    cmd::require_tool("blkid")?;
    let outcome = cmd::run_unchecked("blkid", &["-o", "value", "-s", "LABEL", device])?;

    // blkid exits with 2 when the tag is not present
    match outcome.code {
        Some(0) => {
            let label = outcome.stdout.trim();
            Ok((!label.is_empty()).then(|| label.to_string()))
        }
        Some(2) => Ok(None),
        code => Err(SysError::CommandFailed {
            command: outcome.command,
            code,
            stderr: outcome.stderr.trim().to_string(),
        }),
    }
}

pub fn mount_filesystem(device: &str, mount_point: &Path) -> Result<()> {
    if !mount_point.exists() {
        debug!("Creating mount point {}", mount_point.display());
        fs::create_dir_all(mount_point)?;
    }

    let target = mount_point.to_string_lossy();
    info!("Mounting {} on {}", device, target);
    cmd::run("mount", &[device, &target])?;
    Ok(())
}

pub fn unmount_filesystem(device_or_mount: &str) -> Result<()> {
    info!("Unmounting {}", device_or_mount);
    cmd::run("umount", &[device_or_mount])?;
    Ok(())
}

/// First mount point of `device`, following symlinks on both sides
pub fn get_mount_point(device: &str) -> Result<Option<String>> {
    let wanted = canonical(device);
    let entries = parse_mountinfo(&fs::read_to_string(MOUNTINFO)?)?;

    Ok(entries
        .into_iter()
        .find(|entry| entry.source == device || canonical(&entry.source) == wanted)
        .map(|entry| entry.mount_point.to_string_lossy().to_string()))
}

/// Copy the contents of `source` into `dest`, preserving ownership and modes
pub fn sync_paths(source: &Path, dest: &Path) -> Result<()> {
    cmd::require_tool("rsync")?;
    let from = format!("{}/", source.display());
    let to = format!("{}/", dest.display());
    info!("Copying {} to {}", from, to);

    let outcome = cmd::run_unchecked("rsync", &["-a", &from, &to])?;
    match outcome.code {
        Some(0) => Ok(()),
        // Vanished source files are expected on a live system
        Some(24) => {
            warn!("Some files vanished while copying {}", from);
            Ok(())
        }
        code => Err(SysError::CommandFailed {
            command: outcome.command,
            code,
            stderr: outcome.stderr.trim().to_string(),
        }),
    }
}

fn canonical(path: &str) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
}

pub fn parse_mountinfo(input: &str) -> Result<Vec<MountEntry>> {
    let mut entries = Vec::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let invalid = || SysError::Parse(format!("invalid mountinfo line: {line}"));
        let (left, right) = line.split_once(" - ").ok_or_else(invalid)?;

        let mount_point = left.split_whitespace().nth(4).ok_or_else(invalid)?;
        let mut right_fields = right.split_whitespace();
        let fs_type = right_fields.next().ok_or_else(invalid)?;
        let source = right_fields.next().ok_or_else(invalid)?;

        entries.push(MountEntry {
            source: unescape_mount_field(source),
            mount_point: PathBuf::from(unescape_mount_field(mount_point)),
            fs_type: fs_type.to_string(),
        });
    }

    Ok(entries)
}

/// Undo the octal escaping of mountinfo fields (e.g. `\040` -> ` `)
fn unescape_mount_field(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..index + 4].iter().all(|b| (b'0'..=b'7').contains(b))
            && let Ok(num) = u8::from_str_radix(&value[index + 1..index + 4], 8)
        {
            output.push(num as char);
            index += 4;
            continue;
        }

        output.push(bytes[index] as char);
        index += 1;
    }

    output
}
