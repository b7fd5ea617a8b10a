//! Shared application state for the command gateway.

use std::sync::Arc;
use std::time::Instant;

use dispatch_core::config::AssignmentConfig;
use dispatch_core::{AssignmentCoordinator, StateStore, Subscription};

/// State shared by every handler.
///
/// Wrapped in [`Arc`] and passed to Axum as router state. The store is
/// the only owner of fleet data; the gateway holds no copies.
#[derive(Debug)]
pub struct AppState {
    /// Authoritative fleet and booking store.
    pub store: Arc<StateStore>,
    /// Booking protocol on top of `store`.
    pub coordinator: AssignmentCoordinator,
    /// When the gateway was created, for the health probe's uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Build the state around an existing store.
    pub fn new(store: Arc<StateStore>, assignment: AssignmentConfig) -> Self {
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), assignment);
        Self {
            store,
            coordinator,
            started_at: Instant::now(),
        }
    }

    /// Attach a new fleet observer.
    pub async fn subscribe(&self) -> Subscription {
        self.store.subscribe().await
    }
}
