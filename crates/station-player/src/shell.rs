//! `sh -c` helpers for configured tool invocations.

use std::process::{Command, Output};

/// Build a `sh -c <cmd>` command.
pub fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

/// Run `cmd` to completion and capture its output.
pub fn run_shell(cmd: &str) -> std::io::Result<Output> {
    shell_command(cmd).output()
}

/// Run a fire-and-forget tool command. Failures are logged, never fatal.
///
/// Returns `true` when the command ran and exited successfully.
pub fn run_logged(cmd: &str) -> bool {
    if cmd.trim().is_empty() {
        return false;
    }
    tracing::debug!(cmd, "exec");
    match run_shell(cmd) {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            tracing::warn!(
                cmd,
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "command failed"
            );
            false
        }
        Err(e) => {
            tracing::warn!(cmd, error = %e, "command could not be run");
            false
        }
    }
}
