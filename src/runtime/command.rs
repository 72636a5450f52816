// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::RuntimeError;
use std::path::Path;
use tracing::debug;

/// Output from a command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute a command and fail on non-zero exit code
pub async fn exec(
    program: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<CommandOutput, RuntimeError> {
    let output = exec_unchecked(program, args, envs).await?;

    if !output.success() {
        return Err(RuntimeError::command_failed(
            command_line(program, args),
            output.exit_code,
            output.stderr.trim(),
        ));
    }

    Ok(output)
}

/// Execute a command and return output regardless of exit code
pub async fn exec_unchecked(
    program: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<CommandOutput, RuntimeError> {
    let line = command_line(program, args);
    debug!(command = %line, "Executing");

    let output = tokio::process::Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RuntimeError::command_failed(&line, -1, e.to_string()))?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!(command = %line, exit_code, "Command exited");

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code,
    })
}

fn command_line(program: &Path, args: &[&str]) -> String {
    format!("{} {}", program.display(), args.join(" "))
}
