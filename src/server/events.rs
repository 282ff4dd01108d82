//! Status change notifications.
//!
//! Observers register with a [`ServerController`](crate::server::ServerController)
//! and are told about every status transition. Delivery is synchronous: each
//! observer runs, in registration order, before the call that changed the
//! status continues.
//!
//! Hosts that would rather await events than implement a callback can
//! register a [`ChannelObserver`] and read from its receiver.

use crate::runtime::ContainerId;
use crate::server::ServerStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Emitted after every status transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChanged {
    /// Status before the transition
    pub previous: ServerStatus,
    /// Status after the transition
    pub status: ServerStatus,
    /// Container recorded by the controller at the time of the transition
    pub container_id: Option<ContainerId>,
}

/// Receives status change notifications.
///
/// Implementations run on the task that changed the status and must not
/// block waiting on another controller operation.
pub trait StatusObserver: Send + Sync {
    /// Called once for every transition.
    fn on_status_changed(&self, event: &StatusChanged);
}

impl<F> StatusObserver for F
where
    F: Fn(&StatusChanged) + Send + Sync,
{
    fn on_status_changed(&self, event: &StatusChanged) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of observers
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn StatusObserver>)>>,
}

impl ObserverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it is notified after all earlier registrations.
    pub fn subscribe(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        tracing::trace!(subscription = ?id, "Observer subscribed");
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        before != observers.len()
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no observer is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer in registration order.
    ///
    /// The observer list is snapshotted first, so observers may subscribe or
    /// unsubscribe from inside their callback; changes apply to the next event.
    pub fn publish(&self, event: &StatusChanged) {
        let observers: Vec<Arc<dyn StatusObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer.on_status_changed(event);
        }
    }
}

/// Observer that forwards every event into an unbounded channel
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<StatusChanged>,
}

impl ChannelObserver {
    /// Create the observer together with the receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusChanged>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusObserver for ChannelObserver {
    fn on_status_changed(&self, event: &StatusChanged) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!("Status receiver dropped, event discarded");
        }
    }
}
