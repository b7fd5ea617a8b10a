//! Booking creation and booking lifecycle.
//!
//! [`AssignmentCoordinator`] validates a request, picks a vehicle, and
//! binds the two inside one [`FleetWriter`] transaction. The transaction
//! holds the store's write lock from selection to publish, so two
//! concurrent requests can never pick the same vehicle: the second one
//! sees the first one's `en-route` status.
//!
//! # Selection
//!
//! 1. A preferred vehicle named by the client wins if it is `available`
//!    (and, under [`CategoryPolicy::ExactOnly`], of the requested category).
//! 2. Otherwise the first `available` vehicle of the requested category,
//!    in fleet listing order.
//! 3. Otherwise, under [`CategoryPolicy::AnyAvailable`], the first
//!    `available` vehicle of any category. The booking is flagged with
//!    `category_fallback` and the substitution is logged.

use std::sync::Arc;

use dispatch_types::{
    Booking, BookingId, BookingRequest, BookingStatus, Urgency, Vehicle, VehicleCategory,
    VehicleId, VehicleStatus,
};
use tracing::{info, warn};

use crate::config::{AssignmentConfig, CategoryPolicy};
use crate::error::{DispatchError, Entity};
use crate::store::{NewBooking, StateStore};

/// The outcome of vehicle selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The chosen vehicle.
    pub vehicle: VehicleId,
    /// Whether the vehicle's category differs from the requested one.
    pub category_fallback: bool,
}

/// Applies the booking protocol on top of a [`StateStore`].
#[derive(Debug, Clone)]
pub struct AssignmentCoordinator {
    store: Arc<StateStore>,
    config: AssignmentConfig,
}

impl AssignmentCoordinator {
    /// Create a coordinator over the given store.
    pub const fn new(store: Arc<StateStore>, config: AssignmentConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Validate a request, assign a vehicle, and store the booking.
    ///
    /// On success the booking is `assigned`, the vehicle is `en-route`,
    /// and observers have been sent one combined change event.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidRequest`] if a required field is missing
    ///   or a value does not parse. The store is left unchanged.
    /// - [`DispatchError::NoVehicleAvailable`] if no eligible vehicle is
    ///   free. The store is left unchanged.
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, DispatchError> {
        let (fields, preferred) = validate_request(request)?;
        let requested = fields.ambulance_type;

        // Everything from here to commit runs under the write lock with no
        // await in between.
        let mut writer = self.store.write().await;
        let selection = select_vehicle(
            writer.vehicles(),
            requested,
            preferred.as_ref(),
            self.config.category_policy,
        )?;

        let pending = writer.insert_booking(fields);
        writer.set_vehicle_status(&selection.vehicle, VehicleStatus::EnRoute)?;
        let booking =
            writer.bind_vehicle(pending.id, &selection.vehicle, selection.category_fallback)?;
        let receivers = writer.commit();

        if selection.category_fallback {
            warn!(
                booking = %booking.id,
                vehicle = %selection.vehicle,
                requested = ?requested,
                "no vehicle of the requested category free, assigned a substitute"
            );
        }
        info!(
            booking = %booking.id,
            vehicle = %selection.vehicle,
            urgency = ?booking.urgency,
            receivers,
            "booking assigned"
        );
        Ok(booking)
    }

    /// Move a booking forward through its lifecycle.
    ///
    /// When the booking reaches a terminal status and
    /// `release_vehicle_on_close` is set, its vehicle returns to
    /// `available` unless another active booking still holds it.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NotFound`] if the booking does not exist.
    /// - [`DispatchError::InvalidTransition`] if `status` is not a legal
    ///   forward step from the booking's current status.
    pub async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, DispatchError> {
        let mut writer = self.store.write().await;
        let current = writer
            .booking(id)
            .map(|b| b.status)
            .ok_or_else(|| DispatchError::booking_not_found(id))?;

        if !current.can_transition_to(status) {
            return Err(DispatchError::InvalidTransition {
                entity: Entity::Booking,
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let booking = writer.set_booking_status(id, status)?;

        let mut released = None;
        if status.is_terminal() && self.config.release_vehicle_on_close {
            if let Some(vehicle_id) = &booking.ambulance_id {
                let occupied = writer.vehicle(vehicle_id).is_some_and(|v| !v.is_available());
                if occupied && !writer.is_vehicle_held(vehicle_id) {
                    writer.set_vehicle_status(vehicle_id, VehicleStatus::Available)?;
                    released = Some(vehicle_id.clone());
                }
            }
        }
        writer.commit();

        info!(
            booking = %id,
            from = %current,
            to = %status,
            released = ?released,
            "booking status updated"
        );
        Ok(booking)
    }
}

/// Turn a raw request into storable fields plus an optional preferred
/// vehicle.
///
/// Blank strings count as absent.
///
/// # Errors
///
/// [`DispatchError::InvalidRequest`] listing every missing required field,
/// or naming the first value that does not parse.
pub fn validate_request(
    request: BookingRequest,
) -> Result<(NewBooking, Option<VehicleId>), DispatchError> {
    let patient_name = present(request.patient_name);
    let phone = present(request.phone);
    let pickup_location = present(request.pickup_location);
    let destination = present(request.destination);

    let (Some(patient_name), Some(phone), Some(pickup_location), Some(destination)) =
        (patient_name.clone(), phone.clone(), pickup_location.clone(), destination.clone())
    else {
        let missing: Vec<&str> = [
            ("patientName", patient_name.is_none()),
            ("phone", phone.is_none()),
            ("pickupLocation", pickup_location.is_none()),
            ("destination", destination.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        return Err(DispatchError::invalid_request(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    };

    let urgency = present(request.urgency)
        .map(|s| s.parse::<Urgency>())
        .transpose()
        .map_err(|e| DispatchError::invalid_request(e.to_string()))?
        .unwrap_or_default();

    let ambulance_type = present(request.ambulance_type)
        .map(|s| s.parse::<VehicleCategory>())
        .transpose()
        .map_err(|e| DispatchError::invalid_request(e.to_string()))?;

    let preferred = present(request.ambulance_id).map(VehicleId::from);

    Ok((
        NewBooking {
            patient_name,
            phone,
            pickup_location,
            destination,
            urgency,
            ambulance_type,
        },
        preferred,
    ))
}

/// Pick a vehicle for a request. Deterministic: ties go to the vehicle
/// listed first.
///
/// # Errors
///
/// [`DispatchError::NoVehicleAvailable`] if nothing eligible is free.
pub fn select_vehicle(
    vehicles: &[Vehicle],
    requested: Option<VehicleCategory>,
    preferred: Option<&VehicleId>,
    policy: CategoryPolicy,
) -> Result<Selection, DispatchError> {
    let matches_request = |v: &Vehicle| requested.is_none_or(|c| v.category == c);

    let preferred = preferred.and_then(|id| {
        vehicles.iter().find(|v| {
            &v.id == id
                && v.is_available()
                && (policy == CategoryPolicy::AnyAvailable || matches_request(v))
        })
    });

    let exact = || {
        vehicles
            .iter()
            .find(|v| v.is_available() && matches_request(v))
    };
    let any = || match policy {
        CategoryPolicy::AnyAvailable => vehicles.iter().find(|v| v.is_available()),
        CategoryPolicy::ExactOnly => None,
    };

    preferred
        .or_else(exact)
        .or_else(any)
        .map(|v| Selection {
            vehicle: v.id.clone(),
            category_fallback: !matches_request(v),
        })
        .ok_or(DispatchError::NoVehicleAvailable {
            category: requested,
        })
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::fleet;

    fn vehicle(id: &str, status: VehicleStatus, category: VehicleCategory) -> Vehicle {
        Vehicle {
            id: VehicleId::from(id),
            driver_name: String::from("Driver"),
            phone: String::from("555"),
            photo: None,
            status,
            location: String::from("Depot"),
            category,
            eta: String::from("5 mins"),
        }
    }

    fn request() -> BookingRequest {
        BookingRequest {
            patient_name: Some(String::from("A")),
            phone: Some(String::from("555")),
            pickup_location: Some(String::from("X")),
            destination: Some(String::from("Y")),
            urgency: Some(String::from("high")),
            ambulance_type: Some(String::from("Basic Life Support")),
            ambulance_id: None,
        }
    }

    #[test]
    fn validate_lists_all_missing_fields() {
        let mut req = request();
        req.pickup_location = None;
        req.phone = Some(String::from("   "));

        match validate_request(req) {
            Err(DispatchError::InvalidRequest { reason }) => {
                assert_eq!(reason, "missing required fields: phone, pickupLocation");
            }
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unknown_category_and_urgency() {
        let mut req = request();
        req.ambulance_type = Some(String::from("Helicopter"));
        assert!(matches!(
            validate_request(req),
            Err(DispatchError::InvalidRequest { .. })
        ));

        let mut req = request();
        req.urgency = Some(String::from("whenever"));
        assert!(matches!(
            validate_request(req),
            Err(DispatchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn validate_defaults_optional_fields() {
        let mut req = request();
        req.urgency = None;
        req.ambulance_type = Some(String::new());
        let (fields, preferred) = validate_request(req).unwrap();
        assert_eq!(fields.urgency, Urgency::Medium);
        assert!(fields.ambulance_type.is_none());
        assert!(preferred.is_none());
    }

    #[test]
    fn select_prefers_exact_category_in_listing_order() {
        let fleet = vec![
            vehicle("AMB001", VehicleStatus::Available, VehicleCategory::AdvancedLifeSupport),
            vehicle("AMB002", VehicleStatus::Busy, VehicleCategory::BasicLifeSupport),
            vehicle("AMB003", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
            vehicle("AMB004", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
        ];
        let selection = select_vehicle(
            &fleet,
            Some(VehicleCategory::BasicLifeSupport),
            None,
            CategoryPolicy::AnyAvailable,
        )
        .unwrap();
        assert_eq!(selection.vehicle.as_str(), "AMB003");
        assert!(!selection.category_fallback);
    }

    #[test]
    fn select_falls_back_only_when_policy_allows() {
        let fleet = vec![
            vehicle("AMB001", VehicleStatus::Busy, VehicleCategory::BasicLifeSupport),
            vehicle("AMB002", VehicleStatus::Available, VehicleCategory::SpeedAmbulance),
        ];

        let selection = select_vehicle(
            &fleet,
            Some(VehicleCategory::BasicLifeSupport),
            None,
            CategoryPolicy::AnyAvailable,
        )
        .unwrap();
        assert_eq!(selection.vehicle.as_str(), "AMB002");
        assert!(selection.category_fallback);

        let result = select_vehicle(
            &fleet,
            Some(VehicleCategory::BasicLifeSupport),
            None,
            CategoryPolicy::ExactOnly,
        );
        assert_eq!(
            result,
            Err(DispatchError::NoVehicleAvailable {
                category: Some(VehicleCategory::BasicLifeSupport)
            })
        );
    }

    #[test]
    fn select_honours_available_preference() {
        let fleet = vec![
            vehicle("AMB001", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
            vehicle("AMB002", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
            vehicle("AMB003", VehicleStatus::Busy, VehicleCategory::BasicLifeSupport),
        ];

        let picked = select_vehicle(
            &fleet,
            None,
            Some(&VehicleId::from("AMB002")),
            CategoryPolicy::AnyAvailable,
        )
        .unwrap();
        assert_eq!(picked.vehicle.as_str(), "AMB002");

        // A busy preference is ignored rather than refused.
        let picked = select_vehicle(
            &fleet,
            None,
            Some(&VehicleId::from("AMB003")),
            CategoryPolicy::AnyAvailable,
        )
        .unwrap();
        assert_eq!(picked.vehicle.as_str(), "AMB001");
    }

    #[test]
    fn select_with_nothing_available_fails() {
        let fleet = vec![vehicle("AMB001", VehicleStatus::Busy, VehicleCategory::BasicLifeSupport)];
        assert!(matches!(
            select_vehicle(&fleet, None, None, CategoryPolicy::AnyAvailable),
            Err(DispatchError::NoVehicleAvailable { category: None })
        ));
    }

    #[tokio::test]
    async fn repeated_vehicle_id_is_never_double_booked() {
        let fleet = vec![
            vehicle("AMB001", VehicleStatus::Busy, VehicleCategory::BasicLifeSupport),
            vehicle("AMB001", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
            vehicle("AMB002", VehicleStatus::Available, VehicleCategory::BasicLifeSupport),
        ];
        let store = Arc::new(StateStore::new(
            fleet,
            Vec::new(),
            &crate::config::BroadcastConfig::default(),
        ));
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), AssignmentConfig::default());

        let vehicles = store.list_vehicles().await;
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles.first().unwrap().status, VehicleStatus::Busy);

        let first = coordinator.create_booking(request()).await.unwrap();
        assert_eq!(first.ambulance_id.unwrap().as_str(), "AMB002");
        for _ in 0..2 {
            assert!(matches!(
                coordinator.create_booking(request()).await,
                Err(DispatchError::NoVehicleAvailable { .. })
            ));
        }
        assert_eq!(store.list_bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn release_on_close_frees_the_vehicle() {
        let store = Arc::new(StateStore::new(
            fleet::seed_vehicles(),
            Vec::new(),
            &crate::config::BroadcastConfig::default(),
        ));
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), AssignmentConfig::default());

        let booking = coordinator.create_booking(request()).await.unwrap();
        let vehicle_id = booking.ambulance_id.clone().unwrap();

        coordinator
            .update_booking_status(booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        let vehicle = store.get_vehicle(&vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn release_can_be_disabled() {
        let store = Arc::new(StateStore::new(
            fleet::seed_vehicles(),
            Vec::new(),
            &crate::config::BroadcastConfig::default(),
        ));
        let config = AssignmentConfig {
            release_vehicle_on_close: false,
            ..AssignmentConfig::default()
        };
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), config);

        let booking = coordinator.create_booking(request()).await.unwrap();
        coordinator
            .update_booking_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        let vehicle = store
            .get_vehicle(booking.ambulance_id.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(vehicle.status, VehicleStatus::EnRoute);
    }
}
