//! `dispatch-watch`: console observer of the dispatch fleet stream.
//!
//! Connects to the gateway's `/ws/fleet` endpoint, keeps a local fleet
//! view through an [`ObserverSession`], and logs one line per render.
//! Connection loss is logged and retried after the reconnect delay; the
//! last known fleet is kept meanwhile. `Ctrl-C` exits.

use anyhow::Context;
use dispatch_session::{FleetView, ObserverSession, SessionConfig, WsTransport};
use dispatch_types::VehicleStatus;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = SessionConfig::from_env().context("reading session configuration")?;
    info!(
        url = %config.url,
        reconnect_secs = config.reconnect_delay.as_secs(),
        "dispatch-watch starting"
    );

    let session = ObserverSession::new(WsTransport::new(config.url.clone()), &config);
    let mut renders = session.subscribe();

    let render_loop = async {
        while renders.changed().await.is_ok() {
            render(&renders.borrow_and_update());
        }
    };

    tokio::select! {
        () = session.run() => {}
        () = render_loop => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("dispatch-watch shutting down");
        }
    }

    Ok(())
}

fn render(view: &FleetView) {
    let count = |status: VehicleStatus| view.vehicles.iter().filter(|v| v.status == status).count();
    info!(
        state = %view.state,
        attempts = view.attempts,
        vehicles = view.vehicles.len(),
        available = count(VehicleStatus::Available),
        en_route = count(VehicleStatus::EnRoute),
        busy = count(VehicleStatus::Busy),
        bookings = view.bookings.len(),
        "fleet view"
    );
    for vehicle in &view.vehicles {
        tracing::debug!(
            id = %vehicle.id,
            status = %vehicle.status,
            location = %vehicle.location,
            driver = %vehicle.driver_name,
            "vehicle"
        );
    }
}
