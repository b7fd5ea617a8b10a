//! Type-safe identifier wrappers.
//!
//! Bookings use UUID v7 (time-ordered) identifiers generated by the
//! server. Vehicles carry the human-readable fleet codes used on the
//! dispatch floor (`AMB001`, `AMB002`, ...), so [`VehicleId`] wraps a
//! string instead.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Prefix shared by every fleet code.
pub const VEHICLE_ID_PREFIX: &str = "AMB";

/// Unique identifier for a booking.
///
/// Always generated server-side; clients never supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BookingId(pub Uuid);

impl BookingId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for BookingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BookingId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<BookingId> for Uuid {
    fn from(id: BookingId) -> Self {
        id.0
    }
}

/// Unique, stable identifier for a vehicle in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleId(pub String);

impl VehicleId {
    /// Build the fleet code for the given sequence number (`7` -> `AMB007`).
    pub fn from_sequence(n: usize) -> Self {
        Self(format!("{VEHICLE_ID_PREFIX}{n:03}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for VehicleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_ids_are_unique() {
        let a = BookingId::new();
        let b = BookingId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn vehicle_id_sequence_is_zero_padded() {
        assert_eq!(VehicleId::from_sequence(5).as_str(), "AMB005");
        assert_eq!(VehicleId::from_sequence(123).as_str(), "AMB123");
    }

    #[test]
    fn vehicle_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&VehicleId::from("AMB001")).ok();
        assert_eq!(json.as_deref(), Some("\"AMB001\""));
    }
}
