use crate::config::{Config, TimeoutConfig, validate_config};
use crate::error::{Error, Result};
use crate::runtime::{ContainerId, ContainerRuntime, DockerRuntime, SIGHUP};
use crate::server::events::{ObserverRegistry, StatusChanged, StatusObserver, SubscriptionId};
use crate::server::{ContainerSpec, ServerStatus};
use futures::StreamExt;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Held by the call chain in flight, or by `clean`
type OperationGuard<'a> = tokio::sync::MutexGuard<'a, ()>;

/// Mutable half of the controller, always accessed under one lock
#[derive(Debug, Default)]
struct ControllerState {
    status: ServerStatus,
    /// Set by the first successful create, cleared only by `clean`
    container_id: Option<ContainerId>,
}

/// Lifecycle controller for the managed nginx container.
///
/// The controller owns one logical server. It pulls the image and creates the
/// container on the first `start`, then reuses that container across every
/// later stop/start cycle until `clean` removes it.
///
/// Operations are guarded by the current status:
///
/// | operation | required status | transient status | on success |
/// |-----------|-----------------|------------------|------------|
/// | `start`   | `Stopped`       | `Starting`       | `Running`  |
/// | `stop`    | `Running`       | `Stopping`       | `Stopped`  |
/// | `restart` | `Running`       | `Restarting`     | `Running`  |
/// | `reload`  | `Running`       | `Reloading`      | `Running`  |
///
/// A call made from any other status fails with [`Error::InvalidTransition`]
/// without touching the runtime or notifying observers. The guard check and
/// the move into the transient status happen under one lock, so at most one
/// operation is ever in flight, even on a multi-threaded runtime.
///
/// `clean` waits for the operation in flight to settle before removing the
/// container. Operations attempted while it runs fail with [`Error::Busy`].
///
/// When a runtime call fails or times out, the controller moves back to the
/// stable status that matches what actually happened, notifies observers, and
/// returns the error. A transient status never outlives its operation.
///
/// All public operations are instrumented with `tracing` spans.
///
/// # Examples
///
/// ```no_run
/// use nginx_switch::ServerController;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> nginx_switch::Result<()> {
///     let controller = Arc::new(ServerController::from_config_file("nginx-switch.json")?);
///
///     controller.subscribe(|event: &nginx_switch::server::StatusChanged| {
///         println!("nginx is {}", event.status);
///     });
///
///     controller.start().await?;
///     controller.reload().await?;
///     controller.stop().await?;
///     controller.clean().await?;
///     Ok(())
/// }
/// ```
pub struct ServerController<R: ContainerRuntime> {
    runtime: R,
    spec: ContainerSpec,
    timeouts: TimeoutConfig,
    state: Mutex<ControllerState>,
    observers: ObserverRegistry,
    /// Held while a transition is applied and published
    delivery: Mutex<()>,
    /// Held across a whole call chain
    operation: tokio::sync::Mutex<()>,
}

impl ServerController<DockerRuntime> {
    /// Create a Docker-backed controller from a configuration file
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::from_config(&config)
    }

    /// Validate `config`, connect to Docker and create a controller
    #[tracing::instrument(skip(config), fields(image = %config.image))]
    pub fn from_config(config: &Config) -> Result<Self> {
        validate_config(config)?;
        let runtime = DockerRuntime::connect(&config.docker)?;
        Ok(Self::new(runtime, config.container_spec(), config.timeouts))
    }
}

impl<R: ContainerRuntime> ServerController<R> {
    /// Create a controller in the `Stopped` status
    pub fn new(runtime: R, spec: ContainerSpec, timeouts: TimeoutConfig) -> Self {
        tracing::debug!(image = %spec.image, "Creating server controller");
        Self {
            runtime,
            spec,
            timeouts,
            state: Mutex::new(ControllerState::default()),
            observers: ObserverRegistry::new(),
            delivery: Mutex::new(()),
            operation: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a controller from a validated configuration and a runtime
    pub fn with_runtime(runtime: R, config: &Config) -> Result<Self> {
        validate_config(config)?;
        Ok(Self::new(runtime, config.container_spec(), config.timeouts))
    }

    /// Current status
    pub fn status(&self) -> ServerStatus {
        self.state().status
    }

    /// Identifier of the managed container, if it has been created
    pub fn container_id(&self) -> Option<ContainerId> {
        self.state().container_id.clone()
    }

    /// Spec the container is (or will be) created from
    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    /// The runtime the controller drives
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Register an observer for status changes
    pub fn subscribe(&self, observer: impl StatusObserver + 'static) -> SubscriptionId {
        self.observers.subscribe(Arc::new(observer))
    }

    /// Register an observer that is already shared
    pub fn subscribe_shared(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Start the server.
    ///
    /// Pulls the image and creates the container if no container exists yet,
    /// then starts it. On failure the status returns to `Stopped`; a container
    /// created before the failure is kept and reused by the next `start`.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let (op, _) = self.begin("start", ServerStatus::Stopped, ServerStatus::Starting)?;
        tracing::info!(image = %self.spec.image, "Starting server");

        let result = async {
            let id = self.ensure_container().await?;
            self.bounded("start container", self.runtime.start_container(&id))
                .await
        }
        .await;

        match result {
            Ok(()) => {
                self.finish(op, ServerStatus::Running);
                tracing::info!("Server started successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start server");
                self.finish(op, ServerStatus::Stopped);
                Err(e)
            }
        }
    }

    /// Stop the running server. On failure the status returns to `Running`.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let (op, id) = self.begin("stop", ServerStatus::Running, ServerStatus::Stopping)?;
        tracing::info!("Stopping server");

        let result = async {
            let id = Self::recorded(id)?;
            self.bounded("stop container", self.runtime.stop_container(&id))
                .await
        }
        .await;

        match result {
            Ok(()) => {
                self.finish(op, ServerStatus::Stopped);
                tracing::info!("Server stopped successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to stop server");
                self.finish(op, ServerStatus::Running);
                Err(e)
            }
        }
    }

    /// Stop and start the running container.
    ///
    /// If stopping fails the status returns to `Running`; if starting again
    /// fails it returns to `Stopped`.
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self) -> Result<()> {
        let (op, id) = self.begin("restart", ServerStatus::Running, ServerStatus::Restarting)?;
        tracing::info!("Restarting server");

        let stopped = async {
            let id = Self::recorded(id)?;
            self.bounded("stop container", self.runtime.stop_container(&id))
                .await?;
            Ok::<_, Error>(id)
        }
        .await;

        let id = match stopped {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to stop server for restart");
                self.finish(op, ServerStatus::Running);
                return Err(e);
            }
        };

        match self
            .bounded("start container", self.runtime.start_container(&id))
            .await
        {
            Ok(()) => {
                self.finish(op, ServerStatus::Running);
                tracing::info!("Server restarted successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start server after stopping it");
                self.finish(op, ServerStatus::Stopped);
                Err(e)
            }
        }
    }

    /// Ask the running server to re-read its configuration (SIGHUP).
    ///
    /// The process keeps running either way, so the status always returns
    /// to `Running`.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&self) -> Result<()> {
        let (op, id) = self.begin("reload", ServerStatus::Running, ServerStatus::Reloading)?;
        tracing::info!("Reloading server configuration");

        let result = async {
            let id = Self::recorded(id)?;
            self.bounded(
                "signal container",
                self.runtime.kill_container(&id, SIGHUP),
            )
            .await
        }
        .await;

        self.finish(op, ServerStatus::Running);
        match result {
            Ok(()) => {
                tracing::info!("Server configuration reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload server configuration");
                Err(e)
            }
        }
    }

    /// Force-remove the managed container, whatever the current status.
    ///
    /// Waits for the operation in flight, if any, to settle first. Does
    /// nothing if no container was ever created, and nothing on a second
    /// call. After a successful removal the recorded identifier is cleared and
    /// the status becomes `Stopped`. Intended for shutdown.
    #[tracing::instrument(skip(self))]
    pub async fn clean(&self) -> Result<()> {
        let op = match self.operation.try_lock() {
            Ok(op) => op,
            Err(_) => {
                tracing::debug!("Waiting for the operation in flight before removing the container");
                self.operation.lock().await
            }
        };

        let Some(id) = self.container_id() else {
            tracing::debug!("No container to remove");
            return Ok(());
        };

        tracing::info!(container_id = %id, "Removing container");
        self.bounded("remove container", self.runtime.remove_container(&id, true))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to remove container");
                e
            })?;

        self.state().container_id = None;
        self.finish(op, ServerStatus::Stopped);

        tracing::info!("Container removed");
        Ok(())
    }

    /// Return the existing container or pull the image and create one.
    async fn ensure_container(&self) -> Result<ContainerId> {
        if let Some(id) = self.container_id() {
            tracing::debug!(container_id = %id, "Reusing existing container");
            return Ok(id);
        }

        self.pull_image().await?;

        let id = self
            .bounded(
                "create container",
                self.runtime.create_container(&self.spec),
            )
            .await
            .map_err(|e| {
                if let Error::Timeout(_) = &e {
                    tracing::warn!("Container create timed out; the next start adopts it if the daemon finished");
                }
                e
            })?;
        tracing::info!(container_id = %id, "Container created");
        self.state().container_id = Some(id.clone());
        Ok(id)
    }

    /// Drain the pull progress stream to completion.
    async fn pull_image(&self) -> Result<()> {
        let image = self.spec.image.as_str();
        tracing::info!(image = %image, "Pulling image");

        let pull = async {
            let mut stream = self.runtime.pull_image(image);
            while let Some(progress) = stream.next().await {
                let progress = progress?;
                tracing::debug!(
                    layer = progress.layer.as_deref().unwrap_or("-"),
                    status = progress.status.as_deref().unwrap_or(""),
                    progress = progress.progress.as_deref().unwrap_or(""),
                    "Pull progress"
                );
            }
            Ok(())
        };

        let limit = self.timeouts.pull();
        Self::with_limit("image pull", limit, pull).await?;
        tracing::info!(image = %image, "Image pulled");
        Ok(())
    }

    /// Bound a runtime call by the operation timeout
    async fn bounded<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        Self::with_limit(what, self.timeouts.operation(), call).await
    }

    async fn with_limit<T>(
        what: &str,
        limit: Duration,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} did not complete within {:?}",
                what, limit
            ))),
        }
    }

    fn recorded(id: Option<ContainerId>) -> Result<ContainerId> {
        id.ok_or_else(|| Error::Other("Server is running but no container is recorded".to_string()))
    }

    /// Check the guard and enter the transient status in one step.
    ///
    /// Returns the operation lock, held until [`Self::finish`], and the
    /// recorded container identifier.
    fn begin(
        &self,
        operation: &'static str,
        required: ServerStatus,
        transient: ServerStatus,
    ) -> Result<(OperationGuard<'_>, Option<ContainerId>)> {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);

        let (op, event) = {
            let mut state = self.state();
            if state.status != required {
                tracing::warn!(operation, status = %state.status, "Rejected lifecycle operation");
                return Err(Error::InvalidTransition {
                    operation,
                    status: state.status,
                });
            }
            // Chains release the lock under `delivery`, so only `clean` can hold it here
            let Ok(op) = self.operation.try_lock() else {
                tracing::warn!(operation, "Rejected lifecycle operation while removing container");
                return Err(Error::Busy { operation });
            };
            (op, Self::transition(&mut state, transient))
        };

        let id = event.container_id.clone();
        self.observers.publish(&event);
        Ok((op, id))
    }

    /// Settle on `status` and release the operation lock.
    ///
    /// Observers are only notified if the status actually changes.
    fn finish(&self, op: OperationGuard<'_>, status: ServerStatus) {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let event = {
            let mut state = self.state();
            (state.status != status).then(|| Self::transition(&mut state, status))
        };
        drop(op);
        if let Some(event) = event {
            self.observers.publish(&event);
        }
    }

    fn transition(state: &mut ControllerState, status: ServerStatus) -> StatusChanged {
        let previous = state.status;
        state.status = status;
        tracing::debug!(from = %previous, to = %status, "Server status changed");
        StatusChanged {
            previous,
            status,
            container_id: state.container_id.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
