//! Command gateway for the ambulance dispatch service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** under `/api` for reading the fleet, hospitals,
//!   and bookings, and for issuing commands (create a booking, advance
//!   its status, move or re-status a vehicle, add a vehicle)
//! - **`WebSocket` endpoint** (`/ws/fleet`) that attaches the client as
//!   an observer of the [`ChangeBus`](dispatch_core::ChangeBus)
//! - **Health probe** (`GET /health`)
//!
//! # Architecture
//!
//! Handlers are thin: every read and command goes through the shared
//! [`StateStore`](dispatch_core::StateStore) or
//! [`AssignmentCoordinator`](dispatch_core::AssignmentCoordinator) held in
//! [`AppState`]. Failures are mapped to HTTP responses in one place,
//! [`ApiError`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
