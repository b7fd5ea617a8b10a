//! Periodic vehicle location updates.
//!
//! Stands in for the GPS feed: every `interval_secs` each vehicle moves,
//! with probability `move_probability`, to one of the configured
//! locations. All moves of one tick are applied in a single store
//! transaction so observers receive one change event per tick.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::store::StateStore;

/// Drives periodic location updates against a [`StateStore`].
#[derive(Debug)]
pub struct LocationTicker {
    store: Arc<StateStore>,
    config: TrackerConfig,
}

impl LocationTicker {
    /// Create a ticker for the given store.
    pub const fn new(store: Arc<StateStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Run one tick. Returns how many vehicles moved.
    pub async fn tick<R: Rng>(&self, rng: &mut R) -> usize {
        if self.config.locations.is_empty() {
            return 0;
        }

        let mut writer = self.store.write().await;
        let mut moves = Vec::new();
        for vehicle in writer.vehicles() {
            if !rng.random_bool(self.config.move_probability) {
                continue;
            }
            if let Some(location) = self.config.locations.choose(rng)
                && *location != vehicle.location
            {
                moves.push((vehicle.id.clone(), location.clone()));
            }
        }

        for (id, location) in &moves {
            // Ids come from the same transaction, so the lookup cannot miss.
            if let Err(e) = writer.set_vehicle_location(id, location.clone(), None) {
                debug!(vehicle = %id, error = %e, "location update skipped");
            }
        }
        writer.commit();
        moves.len()
    }

    /// Tick forever at the configured interval.
    pub async fn run(self, mut rng: StdRng) {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the fleet
        // keeps its seed positions for one full period.
        interval.tick().await;

        loop {
            interval.tick().await;
            let moved = self.tick(&mut rng).await;
            debug!(moved, "location tick");
        }
    }

    /// Spawn [`run`](Self::run) on a background task with an OS-seeded RNG.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.interval_secs,
            move_probability = self.config.move_probability,
            locations = self.config.locations.len(),
            "location ticker started"
        );
        tokio::spawn(self.run(StdRng::from_os_rng()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use dispatch_types::ChangeEvent;

    use super::*;
    use crate::config::BroadcastConfig;
    use crate::fleet;

    fn store() -> Arc<StateStore> {
        Arc::new(StateStore::new(
            fleet::seed_vehicles(),
            Vec::new(),
            &BroadcastConfig::default(),
        ))
    }

    fn config(probability: f64) -> TrackerConfig {
        TrackerConfig {
            enabled: true,
            interval_secs: 30,
            move_probability: probability,
            locations: vec![String::from("Fort Road")],
        }
    }

    #[tokio::test]
    async fn certain_move_relocates_every_vehicle() {
        let store = store();
        let ticker = LocationTicker::new(Arc::clone(&store), config(1.0));
        let mut rng = StdRng::seed_from_u64(7);

        let moved = ticker.tick(&mut rng).await;

        assert_eq!(moved, 4);
        assert!(
            store
                .list_vehicles()
                .await
                .iter()
                .all(|v| v.location == "Fort Road")
        );
    }

    #[tokio::test]
    async fn zero_probability_moves_nothing_and_stays_silent() {
        let store = store();
        let mut sub = store.subscribe().await;
        let _ = sub.recv().await;

        let ticker = LocationTicker::new(Arc::clone(&store), config(0.0));
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(ticker.tick(&mut rng).await, 0);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn one_event_per_tick() {
        let store = store();
        let mut sub = store.subscribe().await;
        let _ = sub.recv().await;

        let ticker = LocationTicker::new(Arc::clone(&store), config(1.0));
        let mut rng = StdRng::seed_from_u64(1);
        ticker.tick(&mut rng).await;

        assert!(matches!(sub.try_recv(), Some(ChangeEvent::AmbulanceUpdate(_))));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn statuses_are_untouched() {
        let store = store();
        let before: Vec<_> = store.list_vehicles().await.iter().map(|v| v.status).collect();

        let ticker = LocationTicker::new(Arc::clone(&store), config(1.0));
        ticker.tick(&mut StdRng::seed_from_u64(3)).await;

        let after: Vec<_> = store.list_vehicles().await.iter().map(|v| v.status).collect();
        assert_eq!(before, after);
    }
}
