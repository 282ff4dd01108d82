/// Error handling module for nginx-switch.
///
/// This module defines the error types used throughout the library.
/// Errors fall into three groups: lifecycle guard rejections, failures
/// reported by the container runtime, and configuration problems.
///
/// # Example
///
/// ```
/// use nginx_switch::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::InvalidTransition { operation, status }) => {
///             println!("Cannot {} while {}", operation, status)
///         }
///         Err(e) if e.is_runtime_failure() => println!("Docker failed: {}", e),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use crate::server::ServerStatus;
use thiserror::Error;

/// Errors that can occur in the nginx-switch library.
#[derive(Error, Debug)]
pub enum Error {
    /// A lifecycle operation was attempted from the wrong status.
    ///
    /// This error occurs when:
    /// - `start` is called while the server is not stopped
    /// - `stop`, `restart` or `reload` is called while the server is not running
    ///
    /// The operation had no side effect. Callers should wait for a stable
    /// status before trying again.
    #[error("Cannot {operation} while server is {status}")]
    InvalidTransition {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Status the controller was in when the operation was rejected.
        status: ServerStatus,
    },

    /// A lifecycle operation was attempted while `clean` was removing the container.
    ///
    /// The operation had no side effect.
    #[error("Cannot {operation} while the container is being removed")]
    Busy {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// The container runtime could not be reached.
    ///
    /// This error occurs when:
    /// - The Docker socket does not exist or is not accessible
    /// - The connection drops in the middle of a request
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The container runtime rejected an operation.
    ///
    /// This error occurs when:
    /// - The container is in a conflicting state
    /// - The container no longer exists
    /// - The daemon reports a server-side error
    #[error("Container runtime operation failed: {0}")]
    RuntimeOperationFailed(String),

    /// The configured image could not be pulled.
    #[error("Failed to pull image: {0}")]
    ImagePullFailed(String),

    /// A runtime call did not complete within its time bound.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Failed to parse configuration from a file or string.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - The image reference is empty
    /// - Two bindings target the same container path or port
    /// - A timeout is zero
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Returns `true` for failures that originate in the container runtime.
    ///
    /// Image pull failures count as runtime failures.
    pub fn is_runtime_failure(&self) -> bool {
        matches!(
            self,
            Error::RuntimeUnavailable(_) | Error::RuntimeOperationFailed(_) | Error::ImagePullFailed(_)
        )
    }
}

/// Result type for nginx-switch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_failure_is_runtime_failure() {
        assert!(Error::ImagePullFailed("manifest unknown".to_string()).is_runtime_failure());
        assert!(Error::RuntimeUnavailable("no socket".to_string()).is_runtime_failure());
        assert!(!Error::Timeout("stop".to_string()).is_runtime_failure());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            operation: "stop",
            status: ServerStatus::Stopped,
        };
        assert_eq!(err.to_string(), "Cannot stop while server is stopped");

        let busy = Error::Busy { operation: "start" };
        assert_eq!(busy.to_string(), "Cannot start while the container is being removed");
        assert!(!busy.is_runtime_failure());
    }
}
