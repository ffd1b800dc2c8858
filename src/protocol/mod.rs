//! Protocol implementation module
//!
//! This module defines the rpcx wire frames, their encoding, and the
//! heartbeat message types carried by the built-in service.

pub mod codec;
pub mod heartbeat;
pub mod message;

pub use self::codec::MessageCodec;
pub use self::heartbeat::{PingArgs, PingReply, TickArgs, TickReply};
pub use self::message::{decode_body, encode_body, Message};

/// Maximum frame payload in bytes
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
