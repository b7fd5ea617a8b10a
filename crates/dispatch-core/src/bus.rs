//! Change fan-out to fleet observers.
//!
//! [`ChangeBus`] wraps a [`tokio::sync::broadcast`] channel and keeps the
//! latest fleet view next to it. Publishing never blocks: a subscriber
//! that cannot keep up falls behind the bounded buffer and, on its next
//! receive, is resynchronized with a fresh full snapshot instead of
//! replaying what it missed. Dead subscribers cost nothing; their
//! receivers are dropped with the transport.
//!
//! # Ordering
//!
//! The fleet view is updated and the event sent under one lock, and a
//! subscription takes its initial snapshot and its receiver under the
//! same lock. Every subscriber therefore sees a snapshot followed by
//! exactly the events published after it, in publish order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dispatch_types::{ChangeEvent, Vehicle};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

/// Fan-out channel delivering [`ChangeEvent`]s to every subscriber.
///
/// Cheap to clone; clones share the same channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    inner: Arc<BusInner>,
}

#[derive(Debug)]
struct BusInner {
    tx: broadcast::Sender<ChangeEvent>,
    fleet: Mutex<Vec<Vehicle>>,
    next_subscriber: AtomicU64,
}

impl ChangeBus {
    /// Create a bus buffering up to `capacity` events per subscriber,
    /// seeded with the current fleet.
    ///
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize, fleet: Vec<Vehicle>) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                tx,
                fleet: Mutex::new(fleet),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new observer.
    ///
    /// The first event the returned [`Subscription`] yields is a full
    /// snapshot of the fleet as of this call.
    pub fn subscribe(&self) -> Subscription {
        let fleet = self.lock_fleet();
        let snapshot = ChangeEvent::AmbulanceUpdate(fleet.clone());
        let rx = self.inner.tx.subscribe();
        drop(fleet);

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        debug!(subscriber = id, "observer subscribed");

        Subscription {
            id,
            pending: Some(snapshot),
            rx,
            bus: self.clone(),
        }
    }

    /// Remove an observer. Equivalent to dropping the subscription.
    pub fn unsubscribe(&self, subscription: Subscription) {
        debug!(subscriber = subscription.id, "observer unsubscribed");
        drop(subscription);
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Returns the number of subscribers the event was queued for. Zero
    /// subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut fleet = self.lock_fleet();
        event.apply_to(&mut fleet);
        let kind = event.kind();
        // send fails only when nobody is subscribed.
        let receivers = self.inner.tx.send(event).unwrap_or(0);
        drop(fleet);
        debug!(kind, receivers, "change published");
        receivers
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// The fleet as the bus last published it.
    pub fn fleet_view(&self) -> Vec<Vehicle> {
        self.lock_fleet().clone()
    }

    fn lock_fleet(&self) -> MutexGuard<'_, Vec<Vehicle>> {
        // The guarded Vec is always left consistent, so a poisoned lock is usable.
        self.inner
            .fleet
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One observer's view of the bus.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    pending: Option<ChangeEvent>,
    rx: broadcast::Receiver<ChangeEvent>,
    bus: ChangeBus,
}

impl Subscription {
    /// Diagnostic identifier, unique per bus.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` only if the bus has been torn down.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => Some(self.resync(skipped)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Lagged(skipped)) => Some(self.resync(skipped)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Jump to the live tail and hand back a snapshot that covers
    /// everything skipped.
    fn resync(&mut self, skipped: u64) -> ChangeEvent {
        let fleet = self.bus.lock_fleet();
        self.rx = self.rx.resubscribe();
        let snapshot = ChangeEvent::AmbulanceUpdate(fleet.clone());
        drop(fleet);
        debug!(subscriber = self.id, skipped, "subscriber lagged, resynchronized");
        snapshot
    }
}
