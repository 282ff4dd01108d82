use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of the managed server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Server is not running
    #[default]
    Stopped,
    /// Server is being pulled, created or started
    Starting,
    /// Server is running
    Running,
    /// Server is stopping
    Stopping,
    /// Server is being stopped and started again
    Restarting,
    /// Server is re-reading its configuration
    Reloading,
}

impl ServerStatus {
    /// Whether this is a rest state (`Stopped` or `Running`).
    ///
    /// Every other status is transient and resolves once the pending
    /// runtime call completes.
    pub fn is_stable(self) -> bool {
        match self {
            ServerStatus::Stopped | ServerStatus::Running => true,
            ServerStatus::Starting
            | ServerStatus::Stopping
            | ServerStatus::Restarting
            | ServerStatus::Reloading => false,
        }
    }

    /// Lowercase name used in logs and messages
    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Stopping => "stopping",
            ServerStatus::Restarting => "restarting",
            ServerStatus::Reloading => "reloading",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
