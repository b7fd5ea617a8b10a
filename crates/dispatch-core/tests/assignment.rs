//! End-to-end booking scenarios against a seeded store.
//!
//! These drive the coordinator, the store, and the bus together the way
//! the command gateway does, including concurrent callers.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeSet;
use std::sync::Arc;

use dispatch_core::config::{AssignmentConfig, BroadcastConfig};
use dispatch_core::{AssignmentCoordinator, DispatchError, StateStore};
use dispatch_types::{
    BookingId, BookingRequest, BookingStatus, ChangeEvent, Vehicle, VehicleCategory, VehicleId,
    VehicleStatus,
};
use tokio::sync::Barrier;

fn vehicle(id: &str, status: VehicleStatus) -> Vehicle {
    Vehicle {
        id: VehicleId::from(id),
        driver_name: format!("Driver {id}"),
        phone: String::from("555"),
        photo: None,
        status,
        location: String::from("Depot"),
        category: VehicleCategory::BasicLifeSupport,
        eta: String::from("5 mins"),
    }
}

/// Four vehicles: three available, one busy.
fn seeded() -> (Arc<StateStore>, AssignmentCoordinator) {
    let vehicles = vec![
        vehicle("AMB001", VehicleStatus::Available),
        vehicle("AMB002", VehicleStatus::Available),
        vehicle("AMB003", VehicleStatus::Busy),
        vehicle("AMB004", VehicleStatus::Available),
    ];
    let store = Arc::new(StateStore::new(vehicles, Vec::new(), &BroadcastConfig::default()));
    let coordinator = AssignmentCoordinator::new(Arc::clone(&store), AssignmentConfig::default());
    (store, coordinator)
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

#[tokio::test]
async fn booking_assigns_an_available_vehicle() {
    let (store, coordinator) = seeded();
    let available_before: BTreeSet<VehicleId> = store
        .list_available_vehicles()
        .await
        .into_iter()
        .map(|v| v.id)
        .collect();

    let booking = coordinator.create_booking(request()).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Assigned);
    assert!(!booking.category_fallback);
    let assigned = booking.ambulance_id.clone().unwrap();
    assert!(available_before.contains(&assigned));

    let vehicle = store.get_vehicle(&assigned).await.unwrap();
    assert_eq!(vehicle.status, VehicleStatus::EnRoute);
    assert!(
        !store
            .list_available_vehicles()
            .await
            .iter()
            .any(|v| v.id == assigned)
    );
}

#[tokio::test]
async fn second_booking_gets_a_different_vehicle_until_exhausted() {
    let (_store, coordinator) = seeded();

    let mut assigned = BTreeSet::new();
    for _ in 0..3 {
        let booking = coordinator.create_booking(request()).await.unwrap();
        assert!(assigned.insert(booking.ambulance_id.unwrap()));
    }

    let result = coordinator.create_booking(request()).await;
    assert!(matches!(result, Err(DispatchError::NoVehicleAvailable { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_share_a_vehicle() {
    let (store, coordinator) = seeded();
    let coordinator = Arc::new(coordinator);
    // Release every task at once so bookings race across worker threads.
    let start = Arc::new(Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                coordinator.create_booking(request()).await
            })
        })
        .collect();

    let mut successes = Vec::new();
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => successes.push(booking),
            Err(DispatchError::NoVehicleAvailable { .. }) => exhausted += 1,
            Err(other) => panic!("unexpected error {other}"),
        }
    }

    assert_eq!(successes.len(), 3);
    assert_eq!(exhausted, 7);
    let distinct: BTreeSet<_> = successes.iter().filter_map(|b| b.ambulance_id.clone()).collect();
    assert_eq!(distinct.len(), 3);
    assert!(store.list_available_vehicles().await.is_empty());
}

#[tokio::test]
async fn active_bookings_hold_distinct_vehicles_across_a_lifecycle() {
    let (store, coordinator) = seeded();

    // Interleave creations and closures; vehicles get recycled.
    let mut open: Vec<BookingId> = Vec::new();
    for round in 0..12 {
        match coordinator.create_booking(request()).await {
            Ok(booking) => open.push(booking.id),
            Err(DispatchError::NoVehicleAvailable { .. }) => {}
            Err(other) => panic!("unexpected error {other}"),
        }
        if round % 2 == 1 && !open.is_empty() {
            let id = open.remove(0);
            let next = if round % 4 == 1 {
                BookingStatus::Completed
            } else {
                BookingStatus::Cancelled
            };
            coordinator.update_booking_status(id, next).await.unwrap();
        }

        let bookings = store.list_bookings().await;
        let active: Vec<_> = bookings
            .iter()
            .filter(|b| b.is_active())
            .filter_map(|b| b.ambulance_id.clone())
            .collect();
        let distinct: BTreeSet<_> = active.iter().cloned().collect();
        assert_eq!(active.len(), distinct.len(), "vehicle shared in round {round}");

        for id in &active {
            let vehicle = store.get_vehicle(id).await.unwrap();
            assert_ne!(vehicle.status, VehicleStatus::Available);
        }
    }
}

#[tokio::test]
async fn no_available_vehicle_fails() {
    let vehicles = vec![vehicle("AMB001", VehicleStatus::Busy)];
    let store = Arc::new(StateStore::new(vehicles, Vec::new(), &BroadcastConfig::default()));
    let coordinator = AssignmentCoordinator::new(Arc::clone(&store), AssignmentConfig::default());

    let result = coordinator.create_booking(request()).await;
    assert!(matches!(result, Err(DispatchError::NoVehicleAvailable { .. })));
    assert!(store.list_bookings().await.is_empty());
}

#[tokio::test]
async fn missing_pickup_is_rejected_and_store_unchanged() {
    let (store, coordinator) = seeded();
    let before = store.list_vehicles().await;
    let mut sub = store.subscribe().await;
    let _ = sub.recv().await;

    let mut req = request();
    req.pickup_location = None;
    let result = coordinator.create_booking(req).await;

    assert!(matches!(result, Err(DispatchError::InvalidRequest { .. })));
    assert_eq!(store.list_vehicles().await, before);
    assert!(store.list_bookings().await.is_empty());
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn status_updates_are_forward_only() {
    let (store, coordinator) = seeded();
    let pending = store
        .create_booking(dispatch_core::NewBooking {
            patient_name: String::from("B"),
            phone: String::from("555"),
            pickup_location: String::from("X"),
            destination: String::from("Y"),
            urgency: dispatch_types::Urgency::Low,
            ambulance_type: None,
        })
        .await;

    let assigned = coordinator
        .update_booking_status(pending.id, BookingStatus::Assigned)
        .await
        .unwrap();
    assert_eq!(assigned.status, BookingStatus::Assigned);

    let completed = coordinator
        .update_booking_status(pending.id, BookingStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.created_at, pending.created_at);

    let backwards = coordinator
        .update_booking_status(pending.id, BookingStatus::Pending)
        .await;
    assert!(matches!(backwards, Err(DispatchError::InvalidTransition { .. })));

    let cancel_terminal = coordinator
        .update_booking_status(pending.id, BookingStatus::Cancelled)
        .await;
    assert!(matches!(cancel_terminal, Err(DispatchError::InvalidTransition { .. })));
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let (_store, coordinator) = seeded();
    let result = coordinator
        .update_booking_status(BookingId::new(), BookingStatus::Completed)
        .await;
    assert!(matches!(result, Err(DispatchError::NotFound { .. })));
}

#[tokio::test]
async fn booking_publishes_one_combined_snapshot() {
    let (store, coordinator) = seeded();
    let mut sub = store.subscribe().await;

    match sub.recv().await {
        Some(ChangeEvent::AmbulanceUpdate(fleet)) => {
            assert_eq!(fleet, store.list_vehicles().await);
        }
        other => panic!("expected initial snapshot, got {other:?}"),
    }

    let booking = coordinator.create_booking(request()).await.unwrap();

    match sub.recv().await {
        Some(ChangeEvent::AmbulanceUpdate(fleet)) => {
            let assigned = booking.ambulance_id.unwrap();
            let vehicle = fleet.iter().find(|v| v.id == assigned).unwrap();
            assert_eq!(vehicle.status, VehicleStatus::EnRoute);
        }
        other => panic!("expected fleet snapshot, got {other:?}"),
    }
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn observers_converge_on_store_state() {
    let (store, coordinator) = seeded();
    let mut early = store.subscribe().await;

    coordinator.create_booking(request()).await.unwrap();
    store
        .update_vehicle_location(&VehicleId::from("AMB003"), String::from("North Side"), None)
        .await
        .unwrap();

    let mut late = store.subscribe().await;
    coordinator.create_booking(request()).await.unwrap();

    for sub in [&mut early, &mut late] {
        let mut view = Vec::new();
        while let Some(event) = sub.try_recv() {
            event.apply_to(&mut view);
        }
        assert_eq!(view, store.list_vehicles().await);
    }
}
