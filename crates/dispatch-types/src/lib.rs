//! Shared type definitions for the ambulance dispatch fleet.
//!
//! This crate is the single source of truth for the records exchanged
//! between the state store, the command gateway, and observers. Types
//! flow downstream to `TypeScript` via `ts-rs` for the dispatch dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Booking and vehicle identifiers
//! - [`enums`] -- Statuses, categories, urgency
//! - [`structs`] -- Vehicles, bookings, hospitals
//! - [`messages`] -- Change events pushed to observers

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BookingStatus, UnknownVariant, Urgency, VehicleCategory, VehicleStatus};
pub use ids::{BookingId, VEHICLE_ID_PREFIX, VehicleId};
pub use messages::ChangeEvent;
pub use structs::{Booking, BookingRequest, DEFAULT_ETA, Hospital, NewVehicle, Vehicle};
