//! rpcx: a minimal RPC client/server pair
//!
//! The client dials its server lazily on first use and offers `ping` and a
//! single-shot `start_tick` heartbeat on top of generic calls. The server
//! runs an accept loop that can be paused, resumed and stopped, and
//! answers the built-in `RPCX.PING`/`RPCX.TICK` methods next to any
//! services registered on it.
pub mod core;

pub mod client;
pub mod network;
pub mod protocol;
pub mod server;
pub mod service;
pub mod util;

// Re-export commonly used items
pub use crate::client::{Client, HeartbeatArgs};
pub use crate::core::{ClientConfig, Error, Result, ServerStatus};
pub use crate::protocol::{PingArgs, PingReply, TickArgs, TickReply};
pub use crate::server::Server;
pub use crate::service::{MethodSet, Registry, ServerDelegate, Service};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
