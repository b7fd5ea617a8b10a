//! Observer session configuration.
//!
//! Values come from the environment so the console client can be
//! pointed at any gateway without a config file:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DISPATCH_WS_URL` | `ws://127.0.0.1:3000/ws/fleet` |
//! | `DISPATCH_RECONNECT_SECS` | `5` |

use std::time::Duration;

use crate::error::SessionError;

/// Default fleet stream endpoint.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:3000/ws/fleet";

/// Fixed delay between a disconnect and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Where to connect and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fleet stream URL.
    pub url: String,
    /// Constant wait before each reconnect. There is no backoff growth
    /// and no retry limit.
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_WS_URL),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl SessionConfig {
    /// Read `DISPATCH_WS_URL` and `DISPATCH_RECONNECT_SECS`, falling back
    /// to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// [`SessionError::Config`] if the URL is not a `ws://` or `wss://` URL
    /// or the delay is not a whole number of seconds.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_vars(
            std::env::var("DISPATCH_WS_URL").ok(),
            std::env::var("DISPATCH_RECONNECT_SECS").ok(),
        )
    }

    fn from_vars(url: Option<String>, delay: Option<String>) -> Result<Self, SessionError> {
        let mut config = Self::default();

        if let Some(url) = url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(SessionError::Config {
                    var: "DISPATCH_WS_URL",
                    reason: format!("expected a ws:// or wss:// URL, got {url:?}"),
                });
            }
            config.url = url;
        }

        if let Some(raw) = delay {
            let secs: u64 = raw.trim().parse().map_err(|e| SessionError::Config {
                var: "DISPATCH_RECONNECT_SECS",
                reason: format!("{e}"),
            })?;
            config.reconnect_delay = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = SessionConfig::from_vars(None, None).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn overrides_apply() {
        let config = SessionConfig::from_vars(
            Some(String::from("wss://dispatch.example/ws/fleet")),
            Some(String::from("2")),
        )
        .unwrap();
        assert_eq!(config.url, "wss://dispatch.example/ws/fleet");
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn rejects_http_url() {
        let err = SessionConfig::from_vars(Some(String::from("http://localhost")), None).unwrap_err();
        assert!(matches!(err, SessionError::Config { var: "DISPATCH_WS_URL", .. }));
    }

    #[test]
    fn rejects_non_numeric_delay() {
        let err = SessionConfig::from_vars(None, Some(String::from("soon"))).unwrap_err();
        assert!(matches!(err, SessionError::Config { var: "DISPATCH_RECONNECT_SECS", .. }));
    }
}
