//! Fan-out hubs.
//!
//! A hub owns a bounded queue and a single dispatch task. Producers publish
//! into the queue and wait while it is full. The dispatch task copies each
//! event into every listener's own bounded queue with a non-blocking send,
//! so one stalled reader never holds up the others. A listener whose queue
//! is full is dropped from the hub, which ends its stream.

use derive_more::Display;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, warn};

/// Identifies one registered listener within a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("listener-{_0}")]
pub struct ListenerId(u64);

/// Publishing failed.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum BusError {
    /// The hub's dispatch task is gone.
    #[display("Event hub {_0} is closed")]
    Closed(String),
}

impl std::error::Error for BusError {}

struct Listeners<E> {
    next_id: u64,
    senders: BTreeMap<ListenerId, mpsc::Sender<E>>,
}

impl<E: Clone> Listeners<E> {
    fn new() -> Self {
        Self {
            next_id: 0,
            senders: BTreeMap::new(),
        }
    }

    fn insert(&mut self, sender: mpsc::Sender<E>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.senders.insert(id, sender);
        id
    }

    /// Delivers to every listener, dropping full or closed ones.
    fn broadcast(&mut self, hub: &str, event: &E) -> usize {
        self.senders.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(hub, listener = %id, "Listener queue full, disconnecting");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(hub, listener = %id, "Listener already gone");
                false
            }
        });
        self.senders.len()
    }
}

/// Broadcast hub with one dispatch task.
pub struct Hub<E> {
    name: Arc<str>,
    queue: mpsc::Sender<E>,
    listeners: Arc<Mutex<Listeners<E>>>,
    listener_capacity: usize,
}

impl<E> Clone for Hub<E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            queue: self.queue.clone(),
            listeners: Arc::clone(&self.listeners),
            listener_capacity: self.listener_capacity,
        }
    }
}

impl<E> fmt::Debug for Hub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("name", &self.name)
            .field("listener_capacity", &self.listener_capacity)
            .finish_non_exhaustive()
    }
}

impl<E> Hub<E>
where
    E: Clone + fmt::Debug + Send + 'static,
{
    /// Creates a hub and spawns its dispatch task on the current runtime.
    ///
    /// The task runs until every clone of the hub is dropped.
    #[instrument(skip(name), fields(hub = tracing::field::Empty))]
    pub fn spawn(name: impl Into<String>, queue_capacity: usize, listener_capacity: usize) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        tracing::Span::current().record("hub", &*name);

        let (queue, receiver) = mpsc::channel(queue_capacity.max(1));
        let listeners = Arc::new(Mutex::new(Listeners::new()));
        tokio::spawn(dispatch(Arc::clone(&name), receiver, Arc::clone(&listeners)));

        info!(queue_capacity, listener_capacity, "Event hub started");
        Self {
            name,
            queue,
            listeners,
            listener_capacity: listener_capacity.max(1),
        }
    }

    /// Hub name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues an event for dispatch, waiting while the queue is full.
    #[instrument(skip(self), fields(hub = %self.name))]
    pub async fn publish(&self, event: E) -> Result<(), BusError> {
        self.queue
            .send(event)
            .await
            .map_err(|_| BusError::Closed(self.name.to_string()))
    }

    /// Registers a listener. Events published after this call reach it.
    pub fn subscribe(&self) -> Subscription<E> {
        let (sender, receiver) = mpsc::channel(self.listener_capacity);
        let id = self.lock().insert(sender);
        debug!(hub = %self.name, listener = %id, "Listener registered");
        Subscription { id, receiver }
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.lock().senders.remove(&id).is_some();
        debug!(hub = %self.name, listener = %id, removed, "Listener removed");
        removed
    }

    /// Currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }

    fn lock(&self) -> MutexGuard<'_, Listeners<E>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn dispatch<E>(
    name: Arc<str>,
    mut receiver: mpsc::Receiver<E>,
    listeners: Arc<Mutex<Listeners<E>>>,
) where
    E: Clone + fmt::Debug,
{
    while let Some(event) = receiver.recv().await {
        let remaining = listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .broadcast(&name, &event);
        debug!(hub = %name, ?event, listeners = remaining, "Event dispatched");
    }
    debug!(hub = %name, "Event hub closed");
}

/// Receiving end of a listener registration.
pub struct Subscription<E> {
    id: ListenerId,
    receiver: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    /// Registration id, for [`Hub::unsubscribe`].
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Next event. `None` once the hub has dropped this listener.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }
}

impl<E> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_every_listener_receives_event() {
        let hub = Hub::spawn("test", 5, 4);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish("hello").await.unwrap();

        assert_eq!(timeout(WAIT, first.recv()).await.unwrap(), Some("hello"));
        assert_eq!(timeout(WAIT, second.recv()).await.unwrap(), Some("hello"));
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_stops_receiving() {
        let hub = Hub::spawn("test", 5, 4);
        let mut kept = hub.subscribe();
        let mut removed = hub.subscribe();

        assert!(hub.unsubscribe(removed.id()));
        assert!(!hub.unsubscribe(removed.id()));
        assert_eq!(hub.listener_count(), 1);

        hub.publish(1).await.unwrap();
        assert_eq!(timeout(WAIT, kept.recv()).await.unwrap(), Some(1));
        assert_eq!(timeout(WAIT, removed.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_full_listener_is_disconnected() {
        let hub = Hub::spawn("test", 5, 1);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        for n in 0..3 {
            hub.publish(n).await.unwrap();
            assert_eq!(timeout(WAIT, fast.recv()).await.unwrap(), Some(n));
        }

        // Only the first event fit; the second overflowed and dropped the listener.
        assert_eq!(timeout(WAIT, slow.recv()).await.unwrap(), Some(0));
        assert_eq!(timeout(WAIT, slow.recv()).await.unwrap(), None);
        assert_eq!(hub.listener_count(), 1);
    }
}
