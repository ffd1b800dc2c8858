use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::Error;
use super::message::Message;
use super::MAX_MESSAGE_SIZE;

/// Length of the big-endian frame length prefix
const LENGTH_PREFIX: usize = 4;

/// Length-prefixed bincode codec for rpcx frames
#[derive(Clone, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Creates a new message codec
    pub fn new() -> Self {
        MessageCodec
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            // Need more data to read message length
            return Ok(None);
        }

        let mut length_bytes = [0u8; LENGTH_PREFIX];
        length_bytes.copy_from_slice(&src[..LENGTH_PREFIX]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(Error::protocol(format!(
                "Frame of {} bytes exceeds limit of {}",
                length, MAX_MESSAGE_SIZE
            )));
        }

        if src.len() < LENGTH_PREFIX + length {
            src.reserve(LENGTH_PREFIX + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let message_bytes = src.split_to(length);

        match bincode::deserialize(&message_bytes) {
            Ok(message) => Ok(Some(message)),
            Err(e) => Err(Error::protocol(format!("Failed to deserialize message: {}", e))),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = bincode::serialize(&item)
            .map_err(|e| Error::protocol(format!("Failed to serialize message: {}", e)))?;

        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(Error::protocol(format!(
                "Frame of {} bytes exceeds limit of {}",
                bytes.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        dst.reserve(LENGTH_PREFIX + bytes.len());
        dst.put_u32(bytes.len() as u32);
        dst.extend_from_slice(&bytes);

        Ok(())
    }
}
