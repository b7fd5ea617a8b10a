//! The authoritative fleet and booking store.
//!
//! [`StateStore`] exclusively owns the vehicle and booking collections.
//! Reads hand out owned copies. Every mutation goes through a
//! [`FleetWriter`], which holds the store's write lock for its whole
//! lifetime and publishes exactly one [`ChangeEvent`] to the
//! [`ChangeBus`] before the lock is released. Callers therefore observe
//! mutations and broadcasts in the same order, and a command's response
//! can never overtake the broadcast for the change it caused.

use std::collections::HashMap;

use chrono::Utc;
use dispatch_types::{
    Booking, BookingId, BookingStatus, ChangeEvent, Hospital, NewVehicle, Urgency, Vehicle,
    VehicleCategory, VehicleId, VehicleStatus, DEFAULT_ETA,
};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info};

use crate::bus::{ChangeBus, Subscription};
use crate::config::{BroadcastConfig, BroadcastMode, DispatchConfig};
use crate::error::{DispatchError, Entity};
use crate::fleet;

/// Validated booking fields, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
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
}

#[derive(Debug, Default)]
struct FleetState {
    vehicles: Vec<Vehicle>,
    bookings: Vec<Booking>,
    booking_index: HashMap<BookingId, usize>,
}

impl FleetState {
    fn vehicle_mut(&mut self, id: &VehicleId) -> Result<&mut Vehicle, DispatchError> {
        self.vehicles
            .iter_mut()
            .find(|v| &v.id == id)
            .ok_or_else(|| DispatchError::ambulance_not_found(id))
    }

    fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.booking_index
            .get(&id)
            .and_then(|&idx| self.bookings.get(idx))
    }

    fn booking_mut(&mut self, id: BookingId) -> Result<&mut Booking, DispatchError> {
        self.booking_index
            .get(&id)
            .and_then(|&idx| self.bookings.get_mut(idx))
            .ok_or_else(|| DispatchError::booking_not_found(id))
    }

    fn is_held(&self, vehicle: &VehicleId) -> bool {
        self.bookings.iter().any(|b| b.holds(vehicle))
    }
}

/// Single source of truth for vehicles and bookings.
#[derive(Debug)]
pub struct StateStore {
    state: RwLock<FleetState>,
    bus: ChangeBus,
    mode: BroadcastMode,
    hospitals: Vec<Hospital>,
}

impl StateStore {
    /// Create a store holding the given fleet, in listing order.
    ///
    /// Vehicle ids must be unique; a repeated id keeps only its first
    /// record.
    pub fn new(
        vehicles: Vec<Vehicle>,
        hospitals: Vec<Hospital>,
        broadcast: &BroadcastConfig,
    ) -> Self {
        let vehicles = fleet::dedupe_by_id(vehicles);
        let bus = ChangeBus::new(broadcast.capacity, vehicles.clone());
        info!(
            vehicles = vehicles.len(),
            hospitals = hospitals.len(),
            mode = ?broadcast.mode,
            "state store initialized"
        );
        Self {
            state: RwLock::new(FleetState {
                vehicles,
                ..FleetState::default()
            }),
            bus,
            mode: broadcast.mode,
            hospitals,
        }
    }

    /// Create a store from configuration, using the built-in seed for
    /// anything the configuration leaves empty.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let (vehicles, hospitals) = fleet::resolve(&config.fleet);
        Self::new(vehicles, hospitals, &config.broadcast)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// All vehicles in insertion order.
    pub async fn list_vehicles(&self) -> Vec<Vehicle> {
        self.state.read().await.vehicles.clone()
    }

    /// A single vehicle.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] if no vehicle has that identifier.
    pub async fn get_vehicle(&self, id: &VehicleId) -> Result<Vehicle, DispatchError> {
        self.state
            .read()
            .await
            .vehicles
            .iter()
            .find(|v| &v.id == id)
            .cloned()
            .ok_or_else(|| DispatchError::ambulance_not_found(id))
    }

    /// Vehicles currently in the given status, in insertion order.
    pub async fn list_vehicles_by_status(&self, status: VehicleStatus) -> Vec<Vehicle> {
        self.state
            .read()
            .await
            .vehicles
            .iter()
            .filter(|v| v.status == status)
            .cloned()
            .collect()
    }

    /// Vehicles eligible for assignment, in insertion order.
    pub async fn list_available_vehicles(&self) -> Vec<Vehicle> {
        self.list_vehicles_by_status(VehicleStatus::Available).await
    }

    /// All bookings in creation order.
    pub async fn list_bookings(&self) -> Vec<Booking> {
        self.state.read().await.bookings.clone()
    }

    /// A single booking.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] if no booking has that identifier.
    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, DispatchError> {
        self.state
            .read()
            .await
            .booking(id)
            .cloned()
            .ok_or_else(|| DispatchError::booking_not_found(id))
    }

    /// The receiving hospitals. Static for the lifetime of the store.
    pub fn hospitals(&self) -> Vec<Hospital> {
        self.hospitals.clone()
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Attach an observer. Its first event is a full snapshot equal to
    /// [`list_vehicles`](Self::list_vehicles) at this moment.
    pub async fn subscribe(&self) -> Subscription {
        // Holding the read lock keeps writers out while the bus hands over
        // its snapshot.
        let _state = self.state.read().await;
        self.bus.subscribe()
    }

    /// The bus this store publishes to.
    pub const fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // Single-step mutations
    // -----------------------------------------------------------------------

    /// Insert a vehicle, or replace the one with the same identifier in
    /// place.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidTransition`] if the replacement would make a
    /// vehicle held by an active booking `available`.
    pub async fn upsert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, DispatchError> {
        let mut writer = self.write().await;
        let stored = writer.upsert_vehicle(vehicle)?;
        writer.commit();
        Ok(stored)
    }

    /// Add a vehicle under the next free fleet code. It starts `available`.
    pub async fn add_vehicle(&self, new: NewVehicle) -> Vehicle {
        let mut writer = self.write().await;
        let vehicle = writer.add_vehicle(new);
        writer.commit();
        vehicle
    }

    /// Change a vehicle's status.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown vehicle;
    /// [`DispatchError::InvalidTransition`] when making a vehicle
    /// `available` while an active booking still holds it.
    pub async fn set_vehicle_status(
        &self,
        id: &VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle, DispatchError> {
        let mut writer = self.write().await;
        let vehicle = writer.set_vehicle_status(id, status)?;
        writer.commit();
        Ok(vehicle)
    }

    /// Record a new position (and optionally a new ETA) for a vehicle.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown vehicle.
    pub async fn update_vehicle_location(
        &self,
        id: &VehicleId,
        location: String,
        eta: Option<String>,
    ) -> Result<Vehicle, DispatchError> {
        let mut writer = self.write().await;
        let vehicle = writer.set_vehicle_location(id, location, eta)?;
        writer.commit();
        Ok(vehicle)
    }

    /// Store a new `pending` booking with a fresh identifier and timestamp.
    pub async fn create_booking(&self, fields: NewBooking) -> Booking {
        let mut writer = self.write().await;
        let booking = writer.insert_booking(fields);
        writer.commit();
        booking
    }

    /// Overwrite a booking's status without transition checks.
    ///
    /// Forward-only enforcement belongs to
    /// [`AssignmentCoordinator::update_booking_status`](crate::coordinator::AssignmentCoordinator::update_booking_status).
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown booking.
    pub async fn set_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, DispatchError> {
        let mut writer = self.write().await;
        let booking = writer.set_booking_status(id, status)?;
        writer.commit();
        Ok(booking)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Open a write transaction.
    ///
    /// This is the single-writer serialization point: while the returned
    /// writer is alive no other reader or writer can touch the store.
    pub async fn write(&self) -> FleetWriter<'_> {
        FleetWriter {
            state: self.state.write().await,
            bus: &self.bus,
            mode: self.mode,
            touched_vehicles: Vec::new(),
            touched_booking: None,
        }
    }
}

/// Exclusive write access to the store.
///
/// Collects the changes made through it and publishes them as a single
/// [`ChangeEvent`] on [`commit`](Self::commit) (or on drop, if commit was
/// not called) while the write lock is still held.
#[derive(Debug)]
pub struct FleetWriter<'a> {
    state: RwLockWriteGuard<'a, FleetState>,
    bus: &'a ChangeBus,
    mode: BroadcastMode,
    touched_vehicles: Vec<VehicleId>,
    touched_booking: Option<BookingId>,
}

impl FleetWriter<'_> {
    /// Vehicles in insertion order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.state.vehicles
    }

    /// Look up a vehicle.
    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.state.vehicles.iter().find(|v| &v.id == id)
    }

    /// Look up a booking.
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.state.booking(id)
    }

    /// Whether an active booking is bound to the vehicle.
    pub fn is_vehicle_held(&self, id: &VehicleId) -> bool {
        self.state.is_held(id)
    }

    /// See [`StateStore::create_booking`].
    pub fn insert_booking(&mut self, fields: NewBooking) -> Booking {
        let now = Utc::now();
        let booking = Booking {
            id: BookingId::new(),
            patient_name: fields.patient_name,
            phone: fields.phone,
            pickup_location: fields.pickup_location,
            destination: fields.destination,
            urgency: fields.urgency,
            ambulance_type: fields.ambulance_type,
            ambulance_id: None,
            status: BookingStatus::Pending,
            category_fallback: false,
            created_at: now,
            updated_at: now,
        };
        let idx = self.state.bookings.len();
        self.state.booking_index.insert(booking.id, idx);
        self.state.bookings.push(booking.clone());
        self.touched_booking = Some(booking.id);
        debug!(booking = %booking.id, "booking stored");
        booking
    }

    /// Bind a vehicle to a booking and mark the booking `assigned`.
    ///
    /// The vehicle's own status is not changed here.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] if either record is missing;
    /// [`DispatchError::InvalidTransition`] if the booking cannot move to
    /// `assigned`.
    pub fn bind_vehicle(
        &mut self,
        booking_id: BookingId,
        vehicle_id: &VehicleId,
        category_fallback: bool,
    ) -> Result<Booking, DispatchError> {
        if self.vehicle(vehicle_id).is_none() {
            return Err(DispatchError::ambulance_not_found(vehicle_id));
        }
        let booking = self.state.booking_mut(booking_id)?;
        if !booking.status.can_transition_to(BookingStatus::Assigned) {
            return Err(DispatchError::InvalidTransition {
                entity: Entity::Booking,
                from: booking.status.to_string(),
                to: BookingStatus::Assigned.to_string(),
            });
        }
        booking.ambulance_id = Some(vehicle_id.clone());
        booking.category_fallback = category_fallback;
        booking.status = BookingStatus::Assigned;
        booking.updated_at = Utc::now();
        let booking = booking.clone();
        self.touched_booking = Some(booking_id);
        Ok(booking)
    }

    /// See [`StateStore::set_booking_status`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown booking.
    pub fn set_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, DispatchError> {
        let booking = self.state.booking_mut(id)?;
        booking.status = status;
        booking.updated_at = Utc::now();
        let booking = booking.clone();
        self.touched_booking = Some(id);
        Ok(booking)
    }

    /// See [`StateStore::set_vehicle_status`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] or [`DispatchError::InvalidTransition`].
    pub fn set_vehicle_status(
        &mut self,
        id: &VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle, DispatchError> {
        let held = self.state.is_held(id);
        let vehicle = self.state.vehicle_mut(id)?;
        if status == VehicleStatus::Available && vehicle.status != VehicleStatus::Available && held
        {
            return Err(DispatchError::InvalidTransition {
                entity: Entity::Ambulance,
                from: vehicle.status.to_string(),
                to: status.to_string(),
            });
        }
        vehicle.status = status;
        let vehicle = vehicle.clone();
        self.touch_vehicle(id);
        Ok(vehicle)
    }

    /// See [`StateStore::update_vehicle_location`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown vehicle.
    pub fn set_vehicle_location(
        &mut self,
        id: &VehicleId,
        location: String,
        eta: Option<String>,
    ) -> Result<Vehicle, DispatchError> {
        let vehicle = self.state.vehicle_mut(id)?;
        vehicle.location = location;
        if let Some(eta) = eta {
            vehicle.eta = eta;
        }
        let vehicle = vehicle.clone();
        self.touch_vehicle(id);
        Ok(vehicle)
    }

    /// See [`StateStore::upsert_vehicle`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidTransition`] when releasing a held vehicle.
    pub fn upsert_vehicle(&mut self, vehicle: Vehicle) -> Result<Vehicle, DispatchError> {
        let held = self.state.is_held(&vehicle.id);
        let id = vehicle.id.clone();
        match self.state.vehicles.iter_mut().find(|v| v.id == vehicle.id) {
            Some(slot) => {
                if vehicle.is_available() && !slot.is_available() && held {
                    return Err(DispatchError::InvalidTransition {
                        entity: Entity::Ambulance,
                        from: slot.status.to_string(),
                        to: vehicle.status.to_string(),
                    });
                }
                slot.clone_from(&vehicle);
            }
            None => self.state.vehicles.push(vehicle.clone()),
        }
        self.touch_vehicle(&id);
        Ok(vehicle)
    }

    /// See [`StateStore::add_vehicle`].
    pub fn add_vehicle(&mut self, new: NewVehicle) -> Vehicle {
        let mut seq = self.state.vehicles.len().saturating_add(1);
        let mut id = VehicleId::from_sequence(seq);
        while self.vehicle(&id).is_some() {
            seq = seq.saturating_add(1);
            id = VehicleId::from_sequence(seq);
        }
        let vehicle = Vehicle {
            id,
            driver_name: new.driver_name,
            phone: new.phone,
            photo: new.photo,
            status: VehicleStatus::Available,
            location: new.location,
            category: new.category,
            eta: new.eta.unwrap_or_else(|| DEFAULT_ETA.to_owned()),
        };
        info!(vehicle = %vehicle.id, category = %vehicle.category, "vehicle added to fleet");
        self.state.vehicles.push(vehicle.clone());
        self.touch_vehicle(&vehicle.id);
        vehicle
    }

    /// Publish the collected changes and release the lock.
    ///
    /// Returns the number of observers the event was queued for.
    pub fn commit(mut self) -> usize {
        self.flush()
    }

    fn touch_vehicle(&mut self, id: &VehicleId) {
        if !self.touched_vehicles.contains(id) {
            self.touched_vehicles.push(id.clone());
        }
    }

    fn flush(&mut self) -> usize {
        let touched = std::mem::take(&mut self.touched_vehicles);
        let booking = self.touched_booking.take();

        let event = if !touched.is_empty() {
            match self.mode {
                BroadcastMode::FullSnapshot => {
                    ChangeEvent::AmbulanceUpdate(self.state.vehicles.clone())
                }
                BroadcastMode::Delta => ChangeEvent::AmbulancePatch(
                    self.state
                        .vehicles
                        .iter()
                        .filter(|v| touched.contains(&v.id))
                        .cloned()
                        .collect(),
                ),
            }
        } else if let Some(booking) = booking.and_then(|id| self.state.booking(id)) {
            ChangeEvent::BookingUpdate(booking.clone())
        } else {
            return 0;
        };

        self.bus.publish(event)
    }
}

impl Drop for FleetWriter<'_> {
    fn drop(&mut self) {
        // Nothing may change without being announced.
        self.flush();
    }
}
