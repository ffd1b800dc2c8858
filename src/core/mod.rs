//! Core types shared by the client and server halves
//!
//! Errors, configuration, the server lifecycle state and the serde helpers
//! used by wire types live here.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{ClientConfig, ServerStatus};

use std::time::Duration;

/// Default port for rpcx servers
pub const DEFAULT_PORT: u16 = 8972;

/// Default keep-alive idle period for client sockets
pub const DEFAULT_KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(60);

/// Namespace the built-in heartbeat service is registered under
pub const INTERNAL_SERVICE: &str = "RPCX";

/// Fully qualified name of the ping method
pub const PING_METHOD: &str = "RPCX.PING";

/// Fully qualified name of the tick method
pub const TICK_METHOD: &str = "RPCX.TICK";
