use std::path::PathBuf;

use thiserror::Error;

use crate::collaborators::CollaboratorError;

/// Failures that abort a demo run.
///
/// Every variant ends the run with exactly one `error` event whose `message`
/// is [`DemoError::headline`] and whose cause is the `Display` output.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("missing key file {}; run `kemtls-demo generate-keys` first ({source})", path.display())]
    MissingKeyMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{reason}")]
    ValidationFailed {
        phase: u8,
        check: &'static str,
        reason: String,
    },

    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error("Missing artifact from an earlier phase: {0}")]
    MissingArtifact(&'static str),

    #[error("Demo task panicked: {0}")]
    Panicked(String),
}

impl DemoError {
    /// Create a phase validation failure.
    pub fn validation(phase: u8, check: &'static str, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            phase,
            check,
            reason: reason.into(),
        }
    }

    /// Adapter for `map_err` on collaborator calls.
    pub fn collaborator(operation: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Collaborator { operation, source }
    }

    /// Short description used as the `message` of the `error` event.
    pub fn headline(&self) -> &'static str {
        match self {
            DemoError::MissingKeyMaterial { .. } => "Server keys not found",
            DemoError::ValidationFailed { check, .. } => *check,
            _ => "Demo execution failed",
        }
    }

    /// Phase the failure belongs to, when it came from a phase check.
    pub fn phase(&self) -> Option<u8> {
        match self {
            DemoError::ValidationFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DemoError>;

/// Rejection of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Demo is already running")]
    AlreadyRunning,
}

/// Benchmark subprocess failures. Always absorbed by the benchmark runner.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {secs:.1}s")]
    Timeout { secs: f64 },

    #[error("exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed output in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_headline_and_cause() {
        let err = DemoError::validation(1, "Key agreement failed", "Keys do not match");
        assert_eq!(err.headline(), "Key agreement failed");
        assert_eq!(err.to_string(), "Keys do not match");
        assert_eq!(err.phase(), Some(1));
    }

    #[test]
    fn test_missing_keys_headline() {
        let err = DemoError::MissingKeyMaterial {
            path: PathBuf::from("keys/auth_server_kyber_pk.bin"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.headline(), "Server keys not found");
        assert!(err.to_string().contains("auth_server_kyber_pk.bin"));
        assert!(err.phase().is_none());
    }

    #[test]
    fn test_collaborator_adapter() {
        let err = DemoError::collaborator("server hello")(CollaboratorError::new("bad key"));
        assert_eq!(err.headline(), "Demo execution failed");
        assert_eq!(err.to_string(), "server hello failed: bad key");
    }

    #[test]
    fn test_start_error_message() {
        assert_eq!(StartError::AlreadyRunning.to_string(), "Demo is already running");
    }
}
