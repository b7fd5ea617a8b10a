//! Fleet-state synchronization and booking assignment.
//!
//! This crate owns the authoritative copy of the fleet and keeps every
//! observer's copy converging on it:
//!
//! - [`store::StateStore`] -- exclusive owner of vehicles and bookings;
//!   all mutations run inside a [`store::FleetWriter`] transaction
//! - [`coordinator::AssignmentCoordinator`] -- validates booking requests,
//!   selects a vehicle, and binds both in one transaction
//! - [`bus::ChangeBus`] -- non-blocking fan-out of change events, with
//!   snapshot-on-subscribe and resync for lagging subscribers
//! - [`tracker::LocationTicker`] -- periodic location updates
//! - [`config`] -- `dispatch-config.yaml` loader
//!
//! # Concurrency
//!
//! Every mutation holds the store's write lock from the first read it
//! depends on until its change event has been published. That lock is
//! the single-writer serialization point: two bookings can never select
//! the same vehicle, and the publish order on the bus is the mutation
//! order.

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fleet;
pub mod store;
pub mod tracker;

pub use bus::{ChangeBus, Subscription};
pub use config::{BroadcastMode, CategoryPolicy, ConfigError, DispatchConfig};
pub use coordinator::AssignmentCoordinator;
pub use error::{DispatchError, Entity};
pub use store::{FleetWriter, NewBooking, StateStore};
pub use tracker::LocationTicker;
