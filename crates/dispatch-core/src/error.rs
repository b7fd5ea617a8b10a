//! Error taxonomy for fleet and booking operations.
//!
//! [`DispatchError`] carries every recoverable failure a caller of the
//! store or the coordinator can see. None of them is a server fault; the
//! command gateway maps each variant to a 4xx-class response.

use dispatch_types::VehicleCategory;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A vehicle in the fleet.
    Ambulance,
    /// A booking.
    Booking,
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ambulance => f.write_str("Ambulance"),
            Self::Booking => f.write_str("Booking"),
        }
    }
}

/// Errors returned by [`StateStore`](crate::store::StateStore) and
/// [`AssignmentCoordinator`](crate::coordinator::AssignmentCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The referenced vehicle or booking does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// What was being looked up.
        entity: Entity,
        /// The identifier that missed.
        id: String,
    },

    /// The booking request is missing required fields or carries
    /// values that cannot be parsed.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Human-readable description of what is wrong.
        reason: String,
    },

    /// No vehicle is eligible for the request right now.
    #[error("no ambulance available{}", category_suffix(.category))]
    NoVehicleAvailable {
        /// The requested category, if one was given.
        category: Option<VehicleCategory>,
    },

    /// The requested status change is not a legal forward step.
    #[error("invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        /// Which kind of record was being changed.
        entity: Entity,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },
}

fn category_suffix(category: &Option<VehicleCategory>) -> String {
    category.map(|c| format!(" for {c}")).unwrap_or_default()
}

impl DispatchError {
    /// Shorthand for a missing vehicle.
    pub fn ambulance_not_found(id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity: Entity::Ambulance,
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing booking.
    pub fn booking_not_found(id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity: Entity::Booking,
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}
