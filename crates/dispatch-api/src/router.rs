//! Axum router construction for the command gateway.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the command gateway.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /ws/fleet` -- `WebSocket` fleet change stream
/// - the vehicle routes under both `/api/ambulances` and `/api/vehicles`
/// - `GET /api/hospitals`
/// - the booking routes under `/api/bookings`
///
/// Unmatched paths get a JSON 404. CORS allows any origin; the
/// dashboard is served from a different port in development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .nest("/ambulances", vehicle_routes())
        .nest("/vehicles", vehicle_routes())
        .route("/hospitals", get(handlers::list_hospitals))
        .route(
            "/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/bookings/{id}", get(handlers::get_booking))
        .route("/bookings/{id}/status", put(handlers::update_booking_status));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ws/fleet", get(ws::ws_fleet))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn vehicle_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list_vehicles).post(handlers::add_vehicle))
        .route("/status/available", get(handlers::list_available_vehicles))
        .route("/{id}", get(handlers::get_vehicle))
        .route("/{id}/status", put(handlers::set_vehicle_status))
        .route("/{id}/location", put(handlers::set_vehicle_location))
}
