//! Transport seam between an observer session and the fleet stream.
//!
//! [`FleetTransport`] opens connections; a [`FleetConnection`] yields
//! decoded [`ChangeEvent`]s until it closes. The session never sees
//! frames, sockets, or URLs. [`WsTransport`] is the `WebSocket`
//! implementation used against the gateway's `/ws/fleet` endpoint.

use std::future::Future;

use dispatch_types::ChangeEvent;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::SessionError;

/// Opens connections to a source of change events.
pub trait FleetTransport: Send + Sync {
    /// An open stream of change events.
    type Connection: FleetConnection;

    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// [`SessionError::Connect`] if the source is unreachable.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, SessionError>> + Send;
}

/// One open stream of change events.
pub trait FleetConnection: Send {
    /// Wait for the next event.
    ///
    /// Returns `Ok(None)` when the remote side closes cleanly.
    ///
    /// # Errors
    ///
    /// [`SessionError::Transport`] on a broken stream and
    /// [`SessionError::Decode`] on a message that is not a change event.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<ChangeEvent>, SessionError>> + Send;
}

/// `WebSocket` transport built on `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Create a transport for the given `ws://` or `wss://` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The URL this transport connects to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FleetTransport for WsTransport {
    type Connection = WsConnection;

    async fn connect(&self) -> Result<WsConnection, SessionError> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SessionError::Connect(format!("{}: {e}", self.url)))?;
        debug!(url = %self.url, status = %response.status(), "fleet stream opened");
        Ok(WsConnection { stream })
    }
}

/// An open `WebSocket` fleet stream.
#[derive(Debug)]
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl FleetConnection for WsConnection {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>, SessionError> {
        loop {
            let Some(frame) = self.stream.next().await else {
                return Ok(None);
            };
            match frame.map_err(|e| SessionError::Transport(e.to_string()))? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Binary(bytes) => return Ok(Some(serde_json::from_slice(&bytes)?)),
                Message::Close(frame) => {
                    debug!(?frame, "fleet stream closed by server");
                    return Ok(None);
                }
                // Pongs are queued by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
