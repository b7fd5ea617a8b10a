//! Client-side observer of the dispatch fleet stream.
//!
//! - [`session::ObserverSession`] -- the `Disconnected -> Connecting ->
//!   Synced` reconnect state machine and local fleet view
//! - [`transport`] -- the [`FleetTransport`] seam and its `WebSocket`
//!   implementation
//! - [`config`] -- environment-driven settings
//!
//! The `dispatch-watch` binary wires these together into a console
//! client that logs every render.

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::SessionError;
pub use session::{FleetView, ObserverSession, SessionState};
pub use transport::{FleetConnection, FleetTransport, WsConnection, WsTransport};
