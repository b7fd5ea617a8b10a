//! Core entity structs: vehicles, bookings, and hospitals.
//!
//! Field names serialize in camelCase to match the dispatch dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BookingStatus, Urgency, VehicleCategory, VehicleStatus};
use crate::ids::{BookingId, VehicleId};

/// ETA shown for vehicles added without one.
pub const DEFAULT_ETA: &str = "5 mins";

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

/// A tracked emergency vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Vehicle {
    /// Stable fleet code.
    pub id: VehicleId,
    /// Name of the vehicle's operator.
    pub driver_name: String,
    /// Contact number for the operator.
    pub phone: String,
    /// Optional operator photo (usually a data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Current operational status.
    pub status: VehicleStatus,
    /// Free-text current location.
    pub location: String,
    /// Capability class.
    #[serde(rename = "type")]
    pub category: VehicleCategory,
    /// Estimated time of arrival. Opaque display string.
    pub eta: String,
}

impl Vehicle {
    /// Whether the vehicle can be assigned to a new booking.
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }
}

/// Fields supplied when a vehicle is added to the fleet administratively.
///
/// The identifier is allocated by the store and the status always starts
/// as [`VehicleStatus::Available`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewVehicle {
    /// Name of the vehicle's operator.
    pub driver_name: String,
    /// Contact number for the operator.
    pub phone: String,
    /// Optional operator photo.
    #[serde(default)]
    pub photo: Option<String>,
    /// Free-text starting location.
    pub location: String,
    /// Capability class.
    #[serde(rename = "type")]
    pub category: VehicleCategory,
    /// Display ETA; [`DEFAULT_ETA`] when omitted.
    #[serde(default)]
    pub eta: Option<String>,
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// Raw booking request as received from a client.
///
/// Every field is optional on the wire so that missing input surfaces as
/// a domain validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct BookingRequest {
    /// Patient (requester) name. Required.
    pub patient_name: Option<String>,
    /// Requester contact number. Required.
    pub phone: Option<String>,
    /// Pickup location. Required.
    pub pickup_location: Option<String>,
    /// Destination (usually a hospital). Required.
    pub destination: Option<String>,
    /// Urgency level (`low`, `medium`, `high`, `critical`).
    pub urgency: Option<String>,
    /// Requested vehicle category display name.
    pub ambulance_type: Option<String>,
    /// Vehicle the client would prefer, if still available.
    pub ambulance_id: Option<String>,
}

/// A patient booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Booking {
    /// Server-generated identifier.
    pub id: BookingId,
    /// Patient (requester) name.
    pub patient_name: String,
    /// Requester contact number.
    pub phone: String,
    /// Pickup location.
    pub pickup_location: String,
    /// Destination.
    pub destination: String,
    /// Declared urgency.
    pub urgency: Urgency,
    /// Requested vehicle category, if any.
    pub ambulance_type: Option<VehicleCategory>,
    /// Vehicle bound to this booking; `None` until assignment succeeds.
    pub ambulance_id: Option<VehicleId>,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// `true` when the assigned vehicle does not match the requested category.
    pub category_fallback: bool,
    /// Creation time. Set once.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent status change.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether the booking still holds (or may still hold) a vehicle.
    pub const fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether this booking is active and bound to the given vehicle.
    pub fn holds(&self, vehicle: &VehicleId) -> bool {
        self.is_active() && self.ambulance_id.as_ref() == Some(vehicle)
    }
}

// ---------------------------------------------------------------------------
// Hospitals
// ---------------------------------------------------------------------------

/// A receiving hospital offered as a booking destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Hospital {
    /// Slug identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Switchboard number.
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_uses_dashboard_field_names() {
        let vehicle = Vehicle {
            id: VehicleId::from("AMB009"),
            driver_name: String::from("Asha"),
            phone: String::from("555-0100"),
            photo: None,
            status: VehicleStatus::Available,
            location: String::from("Depot"),
            category: VehicleCategory::SpeedAmbulance,
            eta: String::from("3 mins"),
        };

        let json = serde_json::to_value(&vehicle).unwrap_or_default();
        assert_eq!(json["driverName"], "Asha");
        assert_eq!(json["type"], "Speed Ambulance");
        assert_eq!(json["status"], "available");
        assert!(json.get("photo").is_none());
    }

    #[test]
    fn booking_request_tolerates_missing_fields() {
        let request: Result<BookingRequest, _> =
            serde_json::from_str(r#"{"patientName":"A","phone":"555"}"#);
        let request = request.unwrap_or_default();
        assert_eq!(request.patient_name.as_deref(), Some("A"));
        assert!(request.pickup_location.is_none());
    }
}
