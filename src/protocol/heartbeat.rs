//! Heartbeat message shapes for the built-in `PING` and `TICK` methods.
//!
//! Every field is a timestamp. `UNIX_EPOCH` is the unset value.

use serde::{Serialize, Deserialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ping request, stamped by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingArgs {
    /// When the client sent the ping
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub delivered_at: SystemTime,
    /// When the client saw the reply (set by the caller's handler)
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub received_at: SystemTime,
}

/// Ping reply, stamped by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingReply {
    /// When the server received the ping
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub received_at: SystemTime,
    /// When the server sent the reply
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub delivered_at: SystemTime,
}

/// Tick request, stamped by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArgs {
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub delivered_at: SystemTime,
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub received_at: SystemTime,
}

/// Tick reply, stamped by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReply {
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub received_at: SystemTime,
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_time")]
    pub delivered_at: SystemTime,
}

impl PingArgs {
    /// Creates ping args sent now
    pub fn now() -> Self {
        PingArgs {
            delivered_at: SystemTime::now(),
            received_at: UNIX_EPOCH,
        }
    }
}

impl TickArgs {
    /// Creates tick args sent now
    pub fn now() -> Self {
        TickArgs {
            delivered_at: SystemTime::now(),
            received_at: UNIX_EPOCH,
        }
    }
}

impl PingReply {
    /// Stamps both timestamps with the current time
    pub fn stamp(&mut self) {
        self.received_at = SystemTime::now();
        self.delivered_at = SystemTime::now();
    }
}

impl TickReply {
    /// Stamps both timestamps with the current time
    pub fn stamp(&mut self) {
        self.received_at = SystemTime::now();
        self.delivered_at = SystemTime::now();
    }
}

impl Default for PingArgs {
    fn default() -> Self {
        PingArgs {
            delivered_at: UNIX_EPOCH,
            received_at: UNIX_EPOCH,
        }
    }
}

impl Default for PingReply {
    fn default() -> Self {
        PingReply {
            received_at: UNIX_EPOCH,
            delivered_at: UNIX_EPOCH,
        }
    }
}

impl Default for TickArgs {
    fn default() -> Self {
        TickArgs {
            delivered_at: UNIX_EPOCH,
            received_at: UNIX_EPOCH,
        }
    }
}

impl Default for TickReply {
    fn default() -> Self {
        TickReply {
            received_at: UNIX_EPOCH,
            delivered_at: UNIX_EPOCH,
        }
    }
}
