//! Configuration loading and typed config structures for the dispatch server.
//!
//! The canonical configuration lives in `dispatch-config.yaml` at the
//! project root. Every section is optional; anything left out falls back
//! to the defaults defined here, which reproduce the behaviour of the
//! reference deployment.

use std::path::Path;

use dispatch_types::{Hospital, Vehicle};
use serde::Deserialize;

use crate::fleet;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level dispatch configuration.
///
/// Mirrors the structure of `dispatch-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DispatchConfig {
    /// Listener settings for the command gateway.
    #[serde(default)]
    pub server: ServerSettings,

    /// Booking assignment policy.
    #[serde(default)]
    pub assignment: AssignmentConfig,

    /// Change fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Periodic location updates.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Seed data for the fleet and hospital list.
    #[serde(default)]
    pub fleet: FleetConfig,
}

impl DispatchConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override the listener settings:
    /// - `PORT` overrides `server.port`
    /// - `DISPATCH_HOST` overrides `server.host`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the type system does not enforce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast.capacity",
                reason: String::from("must be at least 1"),
            });
        }
        if !(0.0..=1.0).contains(&self.tracker.move_probability) {
            return Err(ConfigError::Invalid {
                field: "tracker.move_probability",
                reason: format!("{} is not within 0.0..=1.0", self.tracker.move_probability),
            });
        }
        if self.tracker.enabled && self.tracker.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "tracker.interval_secs",
                reason: String::from("must be positive when the tracker is enabled"),
            });
        }
        if let Some(id) = fleet::first_duplicate_id(&self.fleet.vehicles) {
            return Err(ConfigError::Invalid {
                field: "fleet.vehicles",
                reason: format!("vehicle id {id} appears more than once"),
            });
        }
        Ok(())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override the listener with `PORT` / `DISPATCH_HOST` when set.
    ///
    /// A `PORT` value that is not a valid port number is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!(value = %val, error = %e, "ignoring invalid PORT"),
            }
        }
        if let Ok(val) = std::env::var("DISPATCH_HOST") {
            self.host = val;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// What to do when no vehicle of the requested category is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    /// Fall back to any available vehicle and flag the booking.
    #[default]
    AnyAvailable,
    /// Refuse the booking unless the category matches exactly.
    ExactOnly,
}

/// Booking assignment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssignmentConfig {
    /// Category mismatch policy.
    #[serde(default)]
    pub category_policy: CategoryPolicy,

    /// Return the vehicle to `available` when its booking completes or
    /// is cancelled.
    #[serde(default = "default_true")]
    pub release_vehicle_on_close: bool,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            category_policy: CategoryPolicy::default(),
            release_vehicle_on_close: true,
        }
    }
}

/// How fleet changes are encoded on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Resend the whole vehicle list on every change.
    #[default]
    FullSnapshot,
    /// Send only the vehicles a mutation touched.
    Delta,
}

/// Change fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Encoding of fleet changes.
    #[serde(default)]
    pub mode: BroadcastMode,

    /// Events buffered per subscriber before it is considered lagged.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            mode: BroadcastMode::default(),
            capacity: default_capacity(),
        }
    }
}

/// Periodic location update configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackerConfig {
    /// Whether the ticker runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Chance that a given vehicle moves on a tick.
    #[serde(default = "default_move_probability")]
    pub move_probability: f64,

    /// Locations a moving vehicle may report.
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            move_probability: default_move_probability(),
            locations: default_locations(),
        }
    }
}

/// Seed data. Empty lists mean "use the built-in seed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FleetConfig {
    /// Vehicles present at startup, in listing order.
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,

    /// Receiving hospitals.
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3000
}

const fn default_true() -> bool {
    true
}

const fn default_capacity() -> usize {
    256
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_move_probability() -> f64 {
    0.2
}

fn default_locations() -> Vec<String> {
    ["Main Street", "Downtown", "Hospital District", "North Side", "South End"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = DispatchConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.assignment.category_policy, CategoryPolicy::AnyAvailable);
        assert!(config.assignment.release_vehicle_on_close);
        assert_eq!(config.broadcast.mode, BroadcastMode::FullSnapshot);
        assert_eq!(config.broadcast.capacity, 256);
        assert_eq!(config.tracker.interval_secs, 30);
        assert_eq!(config.tracker.locations.len(), 5);
        assert!(config.fleet.vehicles.is_empty());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r#"
assignment:
  category_policy: exact_only
  release_vehicle_on_close: false

broadcast:
  mode: delta
  capacity: 16

tracker:
  enabled: false
  move_probability: 0.5
  locations:
    - "Fort Road"
"#;
        let config = DispatchConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.assignment.category_policy, CategoryPolicy::ExactOnly);
        assert!(!config.assignment.release_vehicle_on_close);
        assert_eq!(config.broadcast.mode, BroadcastMode::Delta);
        assert_eq!(config.broadcast.capacity, 16);
        assert!(!config.tracker.enabled);
        assert_eq!(config.tracker.locations, vec![String::from("Fort Road")]);
        // Untouched sections keep their defaults.
        assert_eq!(config.tracker.interval_secs, 30);
    }

    #[test]
    fn parse_seed_vehicles() {
        let yaml = r#"
fleet:
  vehicles:
    - id: "AMB100"
      driverName: "Kiran"
      phone: "555-0199"
      status: "available"
      location: "Depot"
      type: "Basic Life Support"
      eta: "4 mins"
"#;
        let config = DispatchConfig::parse(yaml).ok().unwrap_or_default();
        assert_eq!(config.fleet.vehicles.len(), 1);
        assert_eq!(
            config.fleet.vehicles.first().map(|v| v.id.as_str()),
            Some("AMB100")
        );
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(DispatchConfig::parse("").is_ok());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let result = DispatchConfig::parse("tracker:\n  move_probability: 1.5\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "tracker.move_probability",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_capacity() {
        let result = DispatchConfig::parse("broadcast:\n  capacity: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_duplicate_vehicle_ids() {
        let yaml = r#"
fleet:
  vehicles:
    - id: "AMB001"
      driverName: "Kiran"
      phone: "555-0199"
      status: "busy"
      location: "Depot"
      type: "Basic Life Support"
      eta: "4 mins"
    - id: "AMB001"
      driverName: "Meera"
      phone: "555-0142"
      status: "available"
      location: "Depot"
      type: "Basic Life Support"
      eta: "4 mins"
"#;
        let result = DispatchConfig::parse(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "fleet.vehicles",
                ..
            })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("dispatch-config.yaml");
        if path.exists() {
            let config = DispatchConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
