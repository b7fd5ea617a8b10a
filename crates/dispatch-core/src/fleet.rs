//! Built-in seed data: the starting fleet and the hospital list.
//!
//! Used when `dispatch-config.yaml` does not provide its own `fleet`
//! section. The seed mirrors the first deployment: four vehicles (two
//! available, one en route, one busy) and four receiving hospitals.

use std::collections::HashSet;

use dispatch_types::{Hospital, Vehicle, VehicleCategory, VehicleId, VehicleStatus};
use tracing::warn;

use crate::config::FleetConfig;

/// The default starting fleet, in listing order.
pub fn seed_vehicles() -> Vec<Vehicle> {
    vec![
        seed(
            "AMB001",
            "Ramanna",
            "7892210283",
            VehicleStatus::Available,
            "Main Street & 5th cross, JCR, Chitradurga",
            VehicleCategory::AdvancedLifeSupport,
            "5 mins",
        ),
        seed(
            "AMB002",
            "Nandish",
            "91+---------",
            VehicleStatus::EnRoute,
            "Downtown Medical District",
            VehicleCategory::BasicLifeSupport,
            "12 mins",
        ),
        seed(
            "AMB003",
            "Rahul",
            "91+----------",
            VehicleStatus::Available,
            "District Hospital, Chitradurga",
            VehicleCategory::SpeedAmbulance,
            "8 mins",
        ),
        seed(
            "AMB004",
            "Wilson",
            "91+----------",
            VehicleStatus::Busy,
            "Near Stadium, Chitradurga",
            VehicleCategory::AmbariAmbulance,
            "N/A",
        ),
    ]
}

/// The default hospital list.
pub fn seed_hospitals() -> Vec<Hospital> {
    [
        ("city-hospital", "City General Hospital", "123 Medical Center Dr", "+1-555-1000"),
        ("metro-medical", "Metro Medical Center", "456 Health Plaza", "+1-555-2000"),
        ("emergency-care", "Emergency Care Hospital", "789 Emergency Blvd", "+1-555-3000"),
        ("specialty-clinic", "Specialty Medical Clinic", "321 Specialty Way", "+1-555-4000"),
    ]
    .into_iter()
    .map(|(id, name, address, phone)| Hospital {
        id: id.to_owned(),
        name: name.to_owned(),
        address: address.to_owned(),
        phone: phone.to_owned(),
    })
    .collect()
}

/// Resolve configured seed data, falling back to the built-in seed for
/// any empty list.
pub fn resolve(config: &FleetConfig) -> (Vec<Vehicle>, Vec<Hospital>) {
    let vehicles = if config.vehicles.is_empty() {
        seed_vehicles()
    } else {
        config.vehicles.clone()
    };
    let hospitals = if config.hospitals.is_empty() {
        seed_hospitals()
    } else {
        config.hospitals.clone()
    };
    (vehicles, hospitals)
}

/// The first vehicle id that occurs more than once, if any.
pub fn first_duplicate_id(vehicles: &[Vehicle]) -> Option<&VehicleId> {
    let mut seen = HashSet::new();
    vehicles.iter().map(|v| &v.id).find(|id| !seen.insert(*id))
}

/// Drop every vehicle whose id was already seen, keeping the first.
pub fn dedupe_by_id(vehicles: Vec<Vehicle>) -> Vec<Vehicle> {
    let mut seen = HashSet::new();
    vehicles
        .into_iter()
        .filter(|v| {
            let fresh = seen.insert(v.id.clone());
            if !fresh {
                warn!(vehicle = %v.id, "duplicate vehicle id dropped from fleet");
            }
            fresh
        })
        .collect()
}

fn seed(
    id: &str,
    driver_name: &str,
    phone: &str,
    status: VehicleStatus,
    location: &str,
    category: VehicleCategory,
    eta: &str,
) -> Vehicle {
    Vehicle {
        id: VehicleId::from(id),
        driver_name: driver_name.to_owned(),
        phone: phone.to_owned(),
        photo: None,
        status,
        location: location.to_owned(),
        category,
        eta: eta.to_owned(),
    }
}
