//! Container runtime contract for nginx-switch.
//!
//! The lifecycle controller never talks to Docker directly. It drives a
//! [`ContainerRuntime`], which lets the host plug in the bundled
//! [`DockerRuntime`] or a test double.
//!
//! Every call is asynchronous and fails with a runtime error
//! ([`Error::RuntimeUnavailable`](crate::Error::RuntimeUnavailable),
//! [`Error::RuntimeOperationFailed`](crate::Error::RuntimeOperationFailed) or
//! [`Error::ImagePullFailed`](crate::Error::ImagePullFailed)) on connectivity
//! problems or container state conflicts.
mod docker;

pub use docker::{DockerRuntime, MANAGED_LABEL};

use crate::error::Result;
use crate::server::ContainerSpec;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Hang-up signal, asks nginx to re-read its configuration
pub const SIGHUP: i32 = 1;

/// Identifier of a container created by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wrap a runtime-assigned identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One progress report from an image pull
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgress {
    /// Layer identifier, if the report concerns a single layer
    pub layer: Option<String>,
    /// Status line, e.g. `Downloading` or `Pull complete`
    pub status: Option<String>,
    /// Human readable progress bar
    pub progress: Option<String>,
}

/// Stream of pull progress reports, ending when the pull completes
pub type PullStream = Pin<Box<dyn Stream<Item = Result<PullProgress>> + Send>>;

/// Operations the lifecycle controller needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pull `image`, streaming progress until the pull completes or fails.
    fn pull_image(&self, image: &str) -> PullStream;

    /// Create a container from `spec` without starting it.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Start a created or stopped container.
    async fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Stop a running container.
    async fn stop_container(&self, id: &ContainerId) -> Result<()>;

    /// Send `signal` to the container's main process.
    async fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()>;

    /// Remove the container, stopping it first when `force` is set.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()>;
}
