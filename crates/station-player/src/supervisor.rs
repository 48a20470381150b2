//! Process supervision for the external player.
//!
//! A [`ProcessSupervisor`] launches one player per session and can terminate
//! it. Waiting for exit and draining output happen on the caller's tasks, so
//! nothing here runs inside the coordinator's critical section.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};

use crate::error::PlayerError;
use crate::shell;

/// A launched player process, split into independently owned parts.
pub struct PlayerProcess {
    pub pid: u32,
    pub stdout: Option<Box<dyn Read + Send>>,
    pub stderr: Option<Box<dyn Read + Send>>,
    pub exit: Box<dyn ProcessExit>,
}

/// How a process ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    pub detail: String,
}

/// Blocking wait for natural process termination.
pub trait ProcessExit: Send {
    fn wait(self: Box<Self>) -> ExitReport;
}

pub trait ProcessSupervisor: Send + Sync {
    /// Launch the player for `source`.
    fn start(&self, source: &str) -> Result<PlayerProcess, PlayerError>;

    /// Ask the player identified by `pid` to terminate.
    fn terminate(&self, pid: u32);
}

/// Supervisor that runs the configured player through `sh -c`.
#[derive(Clone, Debug)]
pub struct ShellSupervisor {
    player: String,
    kill: String,
}

impl ShellSupervisor {
    /// `player` gets the quoted source appended; `kill` runs on terminate,
    /// falling back to `kill -TERM <pid>` when empty.
    pub fn new(player: impl Into<String>, kill: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            kill: kill.into(),
        }
    }

    /// The source is single-quoted so `sh` expands nothing inside it.
    fn command_line(&self, source: &str) -> String {
        format!("{} '{}'", self.player, source.replace('\'', r"'\''"))
    }
}

impl ProcessSupervisor for ShellSupervisor {
    fn start(&self, source: &str) -> Result<PlayerProcess, PlayerError> {
        let command = self.command_line(source);
        tracing::info!(cmd = %command, "exec player");
        let mut child = shell::shell_command(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PlayerError::Start { command, source })?;
        let stdout = child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>);
        let stderr = child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>);
        Ok(PlayerProcess {
            pid: child.id(),
            stdout,
            stderr,
            exit: Box::new(ChildExit(child)),
        })
    }

    fn terminate(&self, pid: u32) {
        if self.kill.trim().is_empty() {
            shell::run_logged(&format!("kill -TERM {pid}"));
        } else {
            shell::run_logged(&self.kill);
        }
    }
}

struct ChildExit(Child);

impl ProcessExit for ChildExit {
    fn wait(mut self: Box<Self>) -> ExitReport {
        match self.0.wait() {
            Ok(status) => ExitReport {
                success: status.success(),
                detail: status.to_string(),
            },
            Err(e) => ExitReport {
                success: false,
                detail: format!("wait failed: {e}"),
            },
        }
    }
}

/// Which output pipe a drain reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

const STDOUT_NOISE_PREFIXES: &[&str] = &[
    "Command Line Interface initialized",
    "> Shutting down",
    "VLC media player",
];

const STDERR_NOISE: &[&str] = &[
    "no suitable services discovery module",
    "using the dummy interface",
    "core interface",
    "core libvlc",
    "core playlist",
    "dbus interface",
    "lua interface",
];

/// Known chatter from the player that is not worth logging.
pub fn is_noise(kind: StreamKind, line: &str) -> bool {
    match kind {
        StreamKind::Stdout => STDOUT_NOISE_PREFIXES.iter().any(|p| line.starts_with(p)),
        StreamKind::Stderr => STDERR_NOISE.iter().any(|p| line.contains(p)),
    }
}

/// Forward lines from a process pipe to the log until EOF.
///
/// Returns the number of lines forwarded.
pub fn drain_lines<R: Read>(reader: R, kind: StreamKind, instance: u64) -> Result<usize, PlayerError> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded = 0;
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| PlayerError::Stream {
                stream: kind.as_str(),
                source,
            })?;
        if n == 0 {
            return Ok(forwarded);
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || is_noise(kind, line) {
            continue;
        }
        match kind {
            StreamKind::Stdout => tracing::info!(instance, "player stdout: {line}"),
            StreamKind::Stderr => tracing::debug!(instance, "player stderr: {line}"),
        }
        forwarded += 1;
    }
}
