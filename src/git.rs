//! Git command runner for statelock.
//!
//! Provides a wrapper around git commands with captured stdout/stderr
//! and structured error handling. Only used to derive the local revision
//! that identifies a lock owner when no CI commit id is available.

use crate::error::{LockError, Result};
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(LockError::Git)` - If git could not be spawned or exited non-zero
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| {
            LockError::Git(format!(
                "failed to execute git {}: {} (is git installed?)",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(LockError::Git(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the revision checked out at HEAD (`git rev-parse HEAD`).
pub fn head_revision<P: AsRef<Path>>(cwd: P) -> Result<String> {
    let output = run_git(cwd, &["rev-parse", "HEAD"])?;
    if output.stdout.is_empty() {
        return Err(LockError::Git("git rev-parse HEAD printed nothing".to_string()));
    }
    debug!(revision = %output.stdout, "resolved local git revision");
    Ok(output.stdout)
}
