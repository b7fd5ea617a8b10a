//! Error types for observer sessions.

/// Errors that end a connection attempt or a live stream.
///
/// None of them is fatal to the session: every one leads to
/// `Disconnected` and a retry after the reconnect delay.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The open stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message could not be decoded as a change event.
    #[error("undecodable change event: {0}")]
    Decode(#[from] serde_json::Error),

    /// A configuration value is unusable.
    #[error("invalid {var}: {reason}")]
    Config {
        /// The environment variable at fault.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
