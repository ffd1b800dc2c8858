use std::fmt;
use std::time::Duration;

use serde::{Serialize, Deserialize};

/// Lifecycle state of a server's accept loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerStatus {
    /// Not accepting. Initial state, and terminal for a given listener.
    Stopped,
    /// Listener bound but connections are left in the backlog
    Paused,
    /// Accepting and serving connections
    Running,
}

impl ServerStatus {
    /// Returns the lowercase name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Paused => "paused",
            ServerStatus::Running => "running",
        }
    }
}

impl Default for ServerStatus {
    fn default() -> Self {
        ServerStatus::Stopped
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for an rpcx client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, as "host:port"
    pub address: String,
    /// Enable TCP keep-alive on the dialed socket
    pub keep_alive: bool,
    /// Idle time before keep-alive probes are sent
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub keep_alive_period: Duration,
    /// Drop the connection after a transport failure so the next call dials again
    pub reconnect_on_error: bool,
}

impl ClientConfig {
    /// Creates a configuration for the given address with default settings
    pub fn new(address: impl Into<String>) -> Self {
        ClientConfig {
            address: address.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: format!("127.0.0.1:{}", super::DEFAULT_PORT),
            keep_alive: false,
            keep_alive_period: super::DEFAULT_KEEP_ALIVE_PERIOD,
            reconnect_on_error: false,
        }
    }
}
