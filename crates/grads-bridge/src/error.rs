//! Error types for bridge operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving the interpreter.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Launch configuration is invalid (raised before anything is spawned).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The interpreter binary could not be started.
    #[error("failed to spawn '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// A standard pipe was not captured on the child.
    #[error("child {0} pipe was not captured")]
    MissingPipe(&'static str),

    /// Writing a command to the child's stdin failed.
    #[error("failed to write to interpreter: {0}")]
    Write(#[source] std::io::Error),

    /// A command was issued after the interpreter had already exited.
    #[error("interpreter has exited (code {0:?})")]
    ProcessExited(Option<i32>),

    /// No idle prompt was seen within the configured timeout. Carries the
    /// output collected before giving up.
    #[error("interpreter did not become idle within {timeout:?}")]
    IdleTimeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = BridgeError::Configuration("bad mode".to_string());
        assert_eq!(err.to_string(), "configuration error: bad mode");

        let err = BridgeError::ProcessExited(Some(1));
        assert_eq!(err.to_string(), "interpreter has exited (code Some(1))");

        let err = BridgeError::MissingPipe("stdin");
        assert_eq!(err.to_string(), "child stdin pipe was not captured");

        let err = BridgeError::IdleTimeout {
            timeout: std::time::Duration::from_secs(2),
            stdout: "partial".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "interpreter did not become idle within 2s");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: BridgeError = io.into();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
