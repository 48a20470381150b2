//! Error taxonomy for the playback core.
//!
//! None of these escape the non-blocking entry point; each is handled by the
//! component that detects it and surfaces only as a log line and a status.

use thiserror::Error;

/// Failures detected inside the playback core.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The external player process could not be launched.
    #[error("failed to start `{command}`: {source}")]
    Start {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading a process output pipe failed for a reason other than EOF.
    #[error("{stream} read failed: {source}")]
    Stream {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Navigation was attempted on an empty station list.
    #[error("station list is empty")]
    EmptyList,

    /// A supervised task panicked; the panic was caught at the task boundary.
    #[error("task `{task}` panicked: {message}")]
    Panicked { task: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_names_the_command() {
        let err = PlayerError::Start {
            command: "cvlc --play-and-exit \"x\"".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let text = err.to_string();
        assert!(text.contains("cvlc --play-and-exit"));
        assert!(text.contains("no such file"));
    }

    #[test]
    fn panicked_error_carries_task_name() {
        let err = PlayerError::Panicked {
            task: "handoff".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "task `handoff` panicked: boom");
    }
}
