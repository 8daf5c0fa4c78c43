//! Error taxonomy shared by every operation.
//!
//! Each variant maps to a stable exit code (see [`crate::exit_codes`]) so a
//! scripted caller can branch on the outcome without parsing messages.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::exit_codes;

#[derive(Debug, Error)]
pub enum AsmError {
    /// No pointer file, or the pointer target is missing.
    #[error("no active session (run `asm init` first)")]
    NoActiveSession,

    /// End requested with no unterminated conversation in the log.
    #[error("no active conversation found")]
    NoActiveConversation,

    /// The record that defines current state could not be parsed.
    #[error("corrupt event log {}: line {line}: {reason}", .path.display())]
    CorruptLog {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{op} {}: {source}", .path.display())]
    IoFailure {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another invocation holds the session lock. Retryable.
    #[error("timed out after {waited_ms}ms waiting for lock {}", .path.display())]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A multi-step operation stopped partway; earlier steps took effect.
    #[error("{failed} failed after completing [{}]: {source}", join_steps(.completed))]
    PartialCompletion {
        failed: Step,
        completed: Vec<Step>,
        #[source]
        source: Box<AsmError>,
    },

    #[error("serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Independent side effects of ending a conversation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    IndexAppend,
    LogAppend,
    TranscriptAppend,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::IndexAppend => "conversation index append",
            Step::LogAppend => "event log append",
            Step::TranscriptAppend => "transcript append",
        })
    }
}

fn join_steps(steps: &[Step]) -> String {
    steps
        .iter()
        .map(Step::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AsmError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AsmError::IoFailure {
            op,
            path: path.into(),
            source,
        }
    }

    /// Lock contention is the only condition worth retrying automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AsmError::LockTimeout { .. })
    }

    /// Stable machine-readable kind for structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            AsmError::NoActiveSession => "no_active_session",
            AsmError::NoActiveConversation => "no_active_conversation",
            AsmError::CorruptLog { .. } => "corrupt_log",
            AsmError::IoFailure { .. } => "io_failure",
            AsmError::LockTimeout { .. } => "lock_timeout",
            AsmError::InvalidInput(_) => "invalid_input",
            AsmError::PartialCompletion { .. } => "partial_completion",
            AsmError::Serialize { .. } => "serialize",
            AsmError::Other(_) => "error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AsmError::NoActiveSession => exit_codes::NO_SESSION,
            AsmError::NoActiveConversation => exit_codes::NO_CONVERSATION,
            AsmError::CorruptLog { .. } => exit_codes::CORRUPT_LOG,
            AsmError::IoFailure { .. } => exit_codes::IO_FAILURE,
            AsmError::LockTimeout { .. } => exit_codes::LOCK_TIMEOUT,
            AsmError::PartialCompletion { .. } => exit_codes::PARTIAL,
            AsmError::InvalidInput(_) | AsmError::Serialize { .. } | AsmError::Other(_) => {
                exit_codes::INVALID
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_timeout_is_retryable() {
        let timeout = AsmError::LockTimeout {
            path: PathBuf::from("/s/state.lock"),
            waited_ms: 10,
        };
        assert!(timeout.is_retryable());
        assert!(!AsmError::NoActiveSession.is_retryable());
        assert_eq!(timeout.exit_code(), exit_codes::LOCK_TIMEOUT);
    }

    #[test]
    fn partial_completion_names_failed_and_completed_steps() {
        let err = AsmError::PartialCompletion {
            failed: Step::TranscriptAppend,
            completed: vec![Step::IndexAppend, Step::LogAppend],
            source: Box::new(AsmError::io(
                "append transcript",
                "/s/dialogue.md",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            )),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("transcript append failed"));
        assert!(msg.contains("conversation index append, event log append"));
        assert_eq!(err.kind(), "partial_completion");
    }
}
