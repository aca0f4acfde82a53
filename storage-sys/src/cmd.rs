// SPDX-License-Identifier: GPL-3.0-only

//! Helpers for running the system storage tools

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{Result, SysError};

/// Captured result of a finished tool invocation
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit status into an error, recognising the busy and
    /// already-exists complaints of mount, sfdisk and the LVM tools
    pub fn checked(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }

        let command = self.command;
        let stderr = self.stderr.trim().to_string();
        let lower = stderr.to_lowercase();
        if lower.contains("busy") {
            Err(SysError::Busy { command, stderr })
        } else if lower.contains("already exists") {
            Err(SysError::AlreadyExists { command, stderr })
        } else {
            Err(SysError::CommandFailed {
                command,
                code: self.code,
                stderr,
            })
        }
    }
}

pub fn render(command: &str, args: &[&str]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Locate `tool` on PATH or fail with [`SysError::ToolMissing`]
pub fn require_tool(tool: &str) -> Result<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| SysError::ToolMissing(tool.to_string()))
}

fn map_spawn_error(command: &str, rendered: &str, error: std::io::Error) -> SysError {
    // waitpid() may report ECHILD when SIGCHLD is ignored by the parent; the
    // tool itself has usually run to completion by then.
    if error.raw_os_error() == Some(libc::ECHILD) {
        return SysError::ChildLost(rendered.to_string());
    }
    if error.kind() == std::io::ErrorKind::NotFound {
        return SysError::ToolMissing(command.to_string());
    }
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return SysError::PermissionDenied(rendered.to_string());
    }
    SysError::Io(error)
}

fn outcome(rendered: String, output: Output) -> CommandOutcome {
    CommandOutcome {
        command: rendered,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Run a tool and return its outcome whatever the exit status
pub fn run_unchecked(command: &str, args: &[&str]) -> Result<CommandOutcome> {
    let rendered = render(command, args);
    debug!("Running {}", rendered);

    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|e| map_spawn_error(command, &rendered, e))?;

    Ok(outcome(rendered, output))
}

/// Run a tool, failing on a non-zero exit status
pub fn run(command: &str, args: &[&str]) -> Result<CommandOutcome> {
    run_unchecked(command, args)?.checked()
}

/// Run a tool with `input` written to its stdin. Used to hand passphrases to
/// cryptsetup without exposing them on the command line.
pub fn run_with_input_unchecked(
    command: &str,
    args: &[&str],
    input: &[u8],
) -> Result<CommandOutcome> {
    let rendered = render(command, args);
    debug!("Running {} (with stdin)", rendered);

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| map_spawn_error(command, &rendered, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input)?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| map_spawn_error(command, &rendered, e))?;

    Ok(outcome(rendered, output))
}
