//! Support for library configuration options

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Base URL of the REST API. Every endpoint path is appended to it.
/// Feel free to override it when initing this library.
pub static API_BASE_URL: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("http://localhost:8080/api".to_string())));

/// WebSocket URL of the STOMP broker (the raw WebSocket endpoint of the server's SockJS mount).
/// Feel free to override it when initing this library.
pub static BROKER_URL: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("ws://localhost:8080/ws/websocket".to_string())));

/// Delay before the notification transport tries to reconnect after a drop
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
/// Heart-beat the client offers to send (STOMP `heart-beat` header, first value)
pub const DEFAULT_HEARTBEAT_OUTGOING: Duration = Duration::from_millis(4000);
/// Heart-beat the client asks the server to send (STOMP `heart-beat` header, second value)
pub const DEFAULT_HEARTBEAT_INCOMING: Duration = Duration::from_millis(4000);

/// Environment variable that overrides [`Settings::api_url`]
pub const ENV_API_URL: &str = "MYPLANNER_API_URL";
/// Environment variable that overrides [`Settings::broker_url`]
pub const ENV_BROKER_URL: &str = "MYPLANNER_BROKER_URL";


/// Runtime settings of a [`Planner`](crate::Planner)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub broker_url: String,
    /// Milliseconds between two reconnection attempts
    pub reconnect_delay_ms: u64,
    pub heartbeat_outgoing_ms: u64,
    pub heartbeat_incoming_ms: u64,
    /// Whether the SUBSCRIBE frame asks for a RECEIPT, which is then required to be considered connected
    pub subscribe_receipt: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: lock_string(&API_BASE_URL),
            broker_url: lock_string(&BROKER_URL),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            heartbeat_outgoing_ms: DEFAULT_HEARTBEAT_OUTGOING.as_millis() as u64,
            heartbeat_incoming_ms: DEFAULT_HEARTBEAT_INCOMING.as_millis() as u64,
            subscribe_receipt: true,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. Missing fields keep their default values
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let settings = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(settings)
    }

    /// Default settings, with the values of the `MYPLANNER_*` environment variables applied
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override fields with the `MYPLANNER_*` environment variables that are set
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            log::debug!("Using API URL from {}: {}", ENV_API_URL, url);
            self.api_url = url;
        }
        if let Ok(url) = std::env::var(ENV_BROKER_URL) {
            log::debug!("Using broker URL from {}: {}", ENV_BROKER_URL, url);
            self.broker_url = url;
        }
    }

    pub fn reconnect_delay(&self) -> Duration      { Duration::from_millis(self.reconnect_delay_ms) }
    pub fn heartbeat_outgoing(&self) -> Duration   { Duration::from_millis(self.heartbeat_outgoing_ms) }
    pub fn heartbeat_incoming(&self) -> Duration   { Duration::from_millis(self.heartbeat_incoming_ms) }
}

fn lock_string(value: &Lazy<Arc<Mutex<String>>>) -> String {
    match value.lock() {
        Ok(s) => s.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
