//! Change events pushed to fleet observers.
//!
//! Every event serializes as one JSON object `{ "type": ..., "data": ... }`.
//! The full-snapshot form (`ambulance_update`) is what a newly attached
//! observer receives first and is sufficient on its own to resynchronize.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{Booking, Vehicle};

/// A state change broadcast to every subscribed observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ChangeEvent {
    /// Full vehicle list. Replaces the observer's fleet view.
    AmbulanceUpdate(Vec<Vehicle>),
    /// Changed vehicle records only. Merged into the fleet view by id.
    AmbulancePatch(Vec<Vehicle>),
    /// A booking after a mutation that did not touch the fleet.
    BookingUpdate(Booking),
}

impl ChangeEvent {
    /// Whether this event alone is sufficient to resynchronize an observer.
    pub const fn is_full_snapshot(&self) -> bool {
        matches!(self, Self::AmbulanceUpdate(_))
    }

    /// Short tag used in log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AmbulanceUpdate(_) => "ambulance_update",
            Self::AmbulancePatch(_) => "ambulance_patch",
            Self::BookingUpdate(_) => "booking_update",
        }
    }

    /// Apply this event to a fleet view, replacing or merging records.
    ///
    /// Patched vehicles unknown to the view are appended, preserving the
    /// listing order of everything already present.
    pub fn apply_to(&self, fleet: &mut Vec<Vehicle>) {
        match self {
            Self::AmbulanceUpdate(vehicles) => fleet.clone_from(vehicles),
            Self::AmbulancePatch(changed) => {
                for vehicle in changed {
                    match fleet.iter_mut().find(|v| v.id == vehicle.id) {
                        Some(slot) => slot.clone_from(vehicle),
                        None => fleet.push(vehicle.clone()),
                    }
                }
            }
            Self::BookingUpdate(_) => {}
        }
    }
}
