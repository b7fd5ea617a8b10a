//! REST endpoint handlers for the command gateway.
//!
//! Reads return owned copies from the [`StateStore`](dispatch_core::StateStore);
//! commands go through the store or the
//! [`AssignmentCoordinator`](dispatch_core::AssignmentCoordinator), whose
//! change events reach observers before the handler responds.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/ambulances` | List vehicles (optionally `?status=`) |
//! | `GET` | `/api/ambulances/{id}` | Single vehicle |
//! | `GET` | `/api/ambulances/status/available` | Available vehicles |
//! | `POST` | `/api/ambulances` | Add a vehicle to the fleet |
//! | `PUT` | `/api/ambulances/{id}/status` | Change a vehicle's status |
//! | `PUT` | `/api/ambulances/{id}/location` | Move a vehicle |
//! | `GET` | `/api/hospitals` | Hospital reference list |
//! | `POST` | `/api/bookings` | Create and assign a booking |
//! | `GET` | `/api/bookings` | List bookings |
//! | `GET` | `/api/bookings/{id}` | Single booking |
//! | `PUT` | `/api/bookings/{id}/status` | Advance a booking's status |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use dispatch_core::DispatchError;
use dispatch_types::{
    BookingId, BookingRequest, BookingStatus, NewVehicle, UnknownVariant, VehicleId, VehicleStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/ambulances`.
#[derive(Debug, Deserialize)]
pub struct VehiclesQuery {
    /// Only return vehicles in this status (`available`, `en-route`, `busy`).
    pub status: Option<String>,
}

/// Body for the status-change endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    /// Target status, as its wire string.
    pub status: String,
}

/// Body for `PUT /api/ambulances/{id}/location`.
#[derive(Debug, Deserialize)]
pub struct LocationBody {
    /// New position.
    pub location: String,
    /// New ETA, if it changed.
    #[serde(default)]
    pub eta: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness, the current time, and seconds since start.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

/// List all vehicles in insertion order, optionally filtered by status.
///
/// # Query Parameters
///
/// - `status`: `available` | `en-route` | `busy`
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VehiclesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicles = match params.status.as_deref() {
        Some(raw) => {
            let status: VehicleStatus = raw
                .parse()
                .map_err(|e: UnknownVariant| ApiError::InvalidParameter(e.to_string()))?;
            state.store.list_vehicles_by_status(status).await
        }
        None => state.store.list_vehicles().await,
    };
    json_body(&vehicles)
}

/// Return a single vehicle.
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicle = state.store.get_vehicle(&VehicleId::from(id)).await?;
    json_body(&vehicle)
}

/// List the vehicles currently free for assignment.
pub async fn list_available_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    json_body(&state.store.list_available_vehicles().await)
}

/// Add a vehicle to the fleet. It starts `available` under the next
/// free fleet code.
pub async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewVehicle>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = body?;
    let vehicle = state.store.add_vehicle(new).await;
    Ok((StatusCode::CREATED, json_body(&vehicle)?))
}

/// Change a vehicle's status.
pub async fn set_vehicle_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let status: VehicleStatus = body
        .status
        .parse()
        .map_err(|e: UnknownVariant| DispatchError::invalid_request(e.to_string()))?;
    let vehicle = state
        .store
        .set_vehicle_status(&VehicleId::from(id), status)
        .await?;
    json_body(&vehicle)
}

/// Record a new position for a vehicle.
pub async fn set_vehicle_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    if body.location.trim().is_empty() {
        return Err(DispatchError::invalid_request("missing required fields: location").into());
    }
    let vehicle = state
        .store
        .update_vehicle_location(&VehicleId::from(id), body.location, body.eta)
        .await?;
    json_body(&vehicle)
}

// ---------------------------------------------------------------------------
// Hospitals
// ---------------------------------------------------------------------------

/// Return the static hospital reference list.
pub async fn list_hospitals(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    json_body(&state.store.hospitals())
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// Create a booking and assign a vehicle to it.
///
/// Responds `201 Created` with the stored booking. The fleet change has
/// already been pushed to observers by the time this returns.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let booking = state.coordinator.create_booking(request).await?;
    Ok((StatusCode::CREATED, json_body(&booking)?))
}

/// List all bookings in creation order.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    json_body(&state.store.list_bookings().await)
}

/// Return a single booking.
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state.store.get_booking(id).await?;
    json_body(&booking)
}

/// Advance a booking through its lifecycle.
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_booking_id(&id)?;
    let Json(body) = body?;
    let status: BookingStatus = body
        .status
        .parse()
        .map_err(|e: UnknownVariant| DispatchError::invalid_request(e.to_string()))?;
    let booking = state.coordinator.update_booking_status(id, status).await?;
    json_body(&booking)
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Catch-all for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Booking ids are UUIDs; anything else cannot name a stored booking.
fn parse_booking_id(raw: &str) -> Result<BookingId, ApiError> {
    Uuid::parse_str(raw).map(BookingId::from).map_err(|e| {
        debug!(id = raw, error = %e, "booking id is not a UUID");
        ApiError::from(DispatchError::booking_not_found(raw))
    })
}

/// Encode a response payload. An encoder failure becomes a 500 with the
/// generic error body.
fn json_body<T: Serialize>(value: &T) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(serde_json::to_value(value)?))
}
