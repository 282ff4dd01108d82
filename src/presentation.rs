//! Glue between a host UI and the lifecycle controller.
//!
//! A host renders four actions (start, stop, restart, reload) and enables
//! them according to the controller's status. [`IntentAvailability`] is the
//! single source of truth for that mapping; [`ActionState`] keeps it current
//! by observing the controller, and [`dispatch`] forwards a user intent.
//!
//! # Examples
//!
//! ```no_run
//! use nginx_switch::presentation::{ActionState, Intent, dispatch};
//! use nginx_switch::ServerController;
//! use std::sync::Arc;
//!
//! # async fn example() -> nginx_switch::Result<()> {
//! let controller = ServerController::from_config_file("nginx-switch.json")?;
//! let actions = Arc::new(ActionState::new(controller.status()));
//! controller.subscribe_shared(actions.clone());
//!
//! if actions.is_enabled(Intent::Start) {
//!     dispatch(&controller, Intent::Start).await?;
//! }
//! assert!(actions.is_enabled(Intent::Reload));
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::runtime::ContainerRuntime;
use crate::server::{ServerController, ServerStatus, StatusChanged, StatusObserver};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A user action the host can forward to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Start the server
    Start,
    /// Stop the server
    Stop,
    /// Stop and start the server
    Restart,
    /// Re-read configuration
    Reload,
}

impl Intent {
    /// Every intent, in menu order
    pub const ALL: [Intent; 4] = [Intent::Start, Intent::Stop, Intent::Restart, Intent::Reload];

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            Intent::Start => "Start",
            Intent::Stop => "Stop",
            Intent::Restart => "Restart",
            Intent::Reload => "Reload",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which intents are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentAvailability {
    /// Start is enabled
    pub start: bool,
    /// Stop is enabled
    pub stop: bool,
    /// Restart is enabled
    pub restart: bool,
    /// Reload is enabled
    pub reload: bool,
}

impl IntentAvailability {
    const NONE: Self = Self {
        start: false,
        stop: false,
        restart: false,
        reload: false,
    };

    /// Enabled intents for `status`.
    ///
    /// Only `start` is available when stopped, everything but `start` when
    /// running, and nothing while an operation is in flight.
    pub fn for_status(status: ServerStatus) -> Self {
        match status {
            ServerStatus::Stopped => Self {
                start: true,
                ..Self::NONE
            },
            ServerStatus::Running => Self {
                start: false,
                stop: true,
                restart: true,
                reload: true,
            },
            ServerStatus::Starting
            | ServerStatus::Stopping
            | ServerStatus::Restarting
            | ServerStatus::Reloading => Self::NONE,
        }
    }

    /// Whether `intent` is enabled
    pub fn is_enabled(&self, intent: Intent) -> bool {
        match intent {
            Intent::Start => self.start,
            Intent::Stop => self.stop,
            Intent::Restart => self.restart,
            Intent::Reload => self.reload,
        }
    }
}

/// Observer holding the availability for the latest status
pub struct ActionState {
    current: Mutex<IntentAvailability>,
}

impl ActionState {
    /// Start from the controller's current status
    pub fn new(status: ServerStatus) -> Self {
        Self {
            current: Mutex::new(IntentAvailability::for_status(status)),
        }
    }

    /// Availability as of the last status change
    pub fn availability(&self) -> IntentAvailability {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `intent` is currently enabled
    pub fn is_enabled(&self, intent: Intent) -> bool {
        self.availability().is_enabled(intent)
    }
}

impl StatusObserver for ActionState {
    fn on_status_changed(&self, event: &StatusChanged) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            IntentAvailability::for_status(event.status);
    }
}

/// Forward `intent` to the matching controller operation
#[tracing::instrument(skip(controller))]
pub async fn dispatch<R: ContainerRuntime>(
    controller: &ServerController<R>,
    intent: Intent,
) -> Result<()> {
    match intent {
        Intent::Start => controller.start().await,
        Intent::Stop => controller.stop().await,
        Intent::Restart => controller.restart().await,
        Intent::Reload => controller.reload().await,
    }
}

/// Remove the container on process exit.
///
/// Failures are logged and swallowed so they never block shutdown.
#[tracing::instrument(skip(controller))]
pub async fn shutdown<R: ContainerRuntime>(controller: &ServerController<R>) {
    if let Err(e) = controller.clean().await {
        tracing::warn!(error = %e, "Failed to clean up container on shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_table() {
        let stopped = IntentAvailability::for_status(ServerStatus::Stopped);
        assert_eq!(
            Intent::ALL.map(|i| stopped.is_enabled(i)),
            [true, false, false, false]
        );

        let running = IntentAvailability::for_status(ServerStatus::Running);
        assert_eq!(
            Intent::ALL.map(|i| running.is_enabled(i)),
            [false, true, true, true]
        );

        for status in [
            ServerStatus::Starting,
            ServerStatus::Stopping,
            ServerStatus::Restarting,
            ServerStatus::Reloading,
        ] {
            let transient = IntentAvailability::for_status(status);
            assert_eq!(
                Intent::ALL.map(|i| transient.is_enabled(i)),
                [false; 4],
                "{} should disable every intent",
                status
            );
        }
    }

    #[test]
    fn test_action_state_follows_events() {
        let actions = ActionState::new(ServerStatus::Stopped);
        assert!(actions.is_enabled(Intent::Start));

        actions.on_status_changed(&StatusChanged {
            previous: ServerStatus::Stopped,
            status: ServerStatus::Starting,
            container_id: None,
        });
        assert_eq!(
            actions.availability(),
            IntentAvailability::for_status(ServerStatus::Starting)
        );
        assert!(!actions.is_enabled(Intent::Start));
    }
}
