/// Server management module for nginx-switch.
///
/// This module holds the lifecycle controller for the managed nginx
/// container, its status model, and the notifications it emits.
///
/// # Components
///
/// * `lifecycle` - The [`ServerController`] state machine
/// * `events` - Status change observers and the channel adapter
/// * `spec` - What the container is created from
/// * `status` - The six lifecycle phases
///
/// # Examples
///
/// Watching status changes through a channel:
///
/// ```no_run
/// use nginx_switch::server::{ChannelObserver, ServerController};
///
/// # async fn example() -> nginx_switch::Result<()> {
/// let controller = ServerController::from_config_file("nginx-switch.json")?;
/// let (observer, mut events) = ChannelObserver::new();
/// controller.subscribe(observer);
///
/// controller.start().await?;
/// while let Some(event) = events.recv().await {
///     println!("{} -> {}", event.previous, event.status);
///     if event.status.is_stable() {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub mod events;
pub mod lifecycle;
mod spec;
mod status;

pub use events::{ChannelObserver, ObserverRegistry, StatusChanged, StatusObserver, SubscriptionId};
pub use lifecycle::ServerController;
pub use spec::{Binding, ContainerSpec, NetworkMode, Protocol};
pub use status::ServerStatus;
