//! Enumeration types for fleet and booking state.
//!
//! Wire spellings follow the dispatch dashboard: vehicle statuses are
//! kebab-case (`en-route`), booking statuses and urgencies are lowercase,
//! and vehicle categories use their full display names.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// The kind of value being parsed (e.g. `"vehicle category"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Vehicle status
// ---------------------------------------------------------------------------

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// Idle and eligible for assignment.
    Available,
    /// Assigned to a booking and travelling to the pickup.
    EnRoute,
    /// Occupied (on scene, transporting, or out of service).
    Busy,
}

impl VehicleStatus {
    /// Wire spelling of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::EnRoute => "en-route",
            Self::Busy => "busy",
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = UnknownVariant;

    /// Accepts the wire spelling plus the `en_route` form used by some clients.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "en-route" | "en_route" => Ok(Self::EnRoute),
            "busy" => Ok(Self::Busy),
            _ => Err(UnknownVariant::new("vehicle status", s)),
        }
    }
}

impl core::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Vehicle category
// ---------------------------------------------------------------------------

/// Capability class of a vehicle, also requested by bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VehicleCategory {
    /// Basic life support crew and equipment.
    #[serde(rename = "Basic Life Support")]
    BasicLifeSupport,
    /// Advanced life support (paramedic) crew and equipment.
    #[serde(rename = "Advanced Life Support")]
    AdvancedLifeSupport,
    /// Rapid-response vehicle.
    #[serde(rename = "Speed Ambulance")]
    SpeedAmbulance,
    /// Large-capacity patient transport.
    #[serde(rename = "Ambari Ambulance")]
    AmbariAmbulance,
}

impl VehicleCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [
        Self::BasicLifeSupport,
        Self::AdvancedLifeSupport,
        Self::SpeedAmbulance,
        Self::AmbariAmbulance,
    ];

    /// Display name, identical to the wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicLifeSupport => "Basic Life Support",
            Self::AdvancedLifeSupport => "Advanced Life Support",
            Self::SpeedAmbulance => "Speed Ambulance",
            Self::AmbariAmbulance => "Ambari Ambulance",
        }
    }
}

impl FromStr for VehicleCategory {
    type Err = UnknownVariant;

    /// Case-insensitive match on the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownVariant::new("vehicle category", s))
    }
}

impl core::fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Clinical urgency declared by the requester.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Urgency {
    /// Scheduled or non-emergency transport.
    Low,
    /// Default when the requester does not say.
    #[default]
    Medium,
    /// Time-sensitive.
    High,
    /// Life-threatening.
    Critical,
}

impl FromStr for Urgency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(UnknownVariant::new("urgency", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Booking status
// ---------------------------------------------------------------------------

/// Lifecycle status of a booking.
///
/// Moves forward only: `pending -> assigned -> completed`, or to
/// `cancelled` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BookingStatus {
    /// Created, no vehicle bound yet.
    Pending,
    /// A vehicle has been bound to the booking.
    Assigned,
    /// Patient delivered. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
}

impl BookingStatus {
    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal forward step.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Assigned) | (Self::Assigned, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Wire spelling of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownVariant::new("booking status", s)),
        }
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
