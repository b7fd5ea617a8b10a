//! Reconnecting observer of the fleet change stream.
//!
//! An [`ObserverSession`] keeps a local copy of the fleet in step with the
//! gateway. It moves through three states:
//!
//! ```text
//! Disconnected -> Connecting -> Synced -> Disconnected -> (delay) -> Connecting ...
//! ```
//!
//! `Connecting -> Synced` happens on the first full snapshot received on
//! a connection. Any closure or error moves the session to
//! `Disconnected`; the local fleet is kept as last known until the next
//! snapshot replaces it. Reconnects happen after a constant delay,
//! forever.
//!
//! Every change to the local view is published on a
//! [`watch`](tokio::sync::watch) channel; each published value is one
//! render.

use std::collections::BTreeMap;
use std::time::Duration;

use dispatch_types::{Booking, BookingId, ChangeEvent, Vehicle};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transport::{FleetConnection, FleetTransport};

/// Connection state of an observer session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No live connection. The local fleet, if any, is last known.
    #[default]
    Disconnected,
    /// A connection is being opened or awaits its first snapshot.
    Connecting,
    /// Live and caught up.
    Synced,
}

impl core::fmt::Display for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Synced => f.write_str("synced"),
        }
    }
}

/// The observer's local copy of the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetView {
    /// Current connection state.
    pub state: SessionState,
    /// Fleet in server listing order.
    pub vehicles: Vec<Vehicle>,
    /// Bookings seen on this session, by id.
    pub bookings: BTreeMap<BookingId, Booking>,
    /// Connection attempts made so far.
    pub attempts: u64,
}

/// A reconnecting observer of the fleet stream.
#[derive(Debug)]
pub struct ObserverSession<T> {
    transport: T,
    reconnect_delay: Duration,
    view: watch::Sender<FleetView>,
}

impl<T: FleetTransport> ObserverSession<T> {
    /// Create a session in the `Disconnected` state with an empty view.
    pub fn new(transport: T, config: &SessionConfig) -> Self {
        let (view, _) = watch::channel(FleetView::default());
        Self {
            transport,
            reconnect_delay: config.reconnect_delay,
            view,
        }
    }

    /// Receive every render of the local view.
    pub fn subscribe(&self) -> watch::Receiver<FleetView> {
        self.view.subscribe()
    }

    /// The current local view.
    pub fn view(&self) -> FleetView {
        self.view.borrow().clone()
    }

    /// Run the connect / consume / wait loop forever.
    ///
    /// Only dropping the future (process shutdown) stops it.
    pub async fn run(&self) {
        loop {
            match self.connect_once().await {
                Ok(()) => info!("fleet stream closed"),
                Err(e) => warn!(error = %e, "fleet stream lost"),
            }
            self.set_state(SessionState::Disconnected);
            debug!(delay_secs = self.reconnect_delay.as_secs(), "waiting to reconnect");
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Make one connection attempt and consume the stream until it ends.
    ///
    /// Leaves the session in whatever state the stream ended in; the
    /// caller moves it to `Disconnected`.
    ///
    /// # Errors
    ///
    /// Any [`SessionError`] from connecting or reading.
    pub async fn connect_once(&self) -> Result<(), SessionError> {
        self.view.send_modify(|view| {
            view.state = SessionState::Connecting;
            view.attempts = view.attempts.saturating_add(1);
        });

        let mut connection = self.transport.connect().await?;
        while let Some(event) = connection.next_event().await? {
            self.apply(&event);
        }
        Ok(())
    }

    /// Fold one change event into the local view and publish it.
    ///
    /// Fleet patches that arrive before the connection's first snapshot
    /// are dropped; the snapshot will cover them.
    pub fn apply(&self, event: &ChangeEvent) {
        self.view.send_if_modified(|view| match event {
            ChangeEvent::AmbulanceUpdate(_) => {
                event.apply_to(&mut view.vehicles);
                if view.state != SessionState::Synced {
                    info!(vehicles = view.vehicles.len(), "fleet synchronized");
                    view.state = SessionState::Synced;
                }
                true
            }
            ChangeEvent::AmbulancePatch(changed) => {
                if view.state != SessionState::Synced {
                    debug!(changed = changed.len(), "patch before snapshot ignored");
                    return false;
                }
                event.apply_to(&mut view.vehicles);
                true
            }
            ChangeEvent::BookingUpdate(booking) => {
                view.bookings.insert(booking.id, booking.clone());
                true
            }
        });
    }

    fn set_state(&self, state: SessionState) {
        self.view.send_if_modified(|view| {
            if view.state == state {
                return false;
            }
            view.state = state;
            true
        });
    }
}
