use serde::{Serialize, Deserialize};

/// Frames exchanged on an rpcx connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Call issued by a client
    Request {
        /// Sequence number chosen by the client, echoed in the response
        seq: u64,
        /// Target method, as "Service.Method"
        service_method: String,
        /// Bincode-encoded args
        body: Vec<u8>,
    },

    /// Answer to exactly one request
    Response {
        /// Sequence number of the request being answered
        seq: u64,
        /// Echo of the requested method
        service_method: String,
        /// Failure reported by the server; the body is empty when set
        error: Option<String>,
        /// Bincode-encoded reply
        body: Vec<u8>,
    },
}

impl Message {
    /// Builds a request frame with an encoded args value
    pub fn request<A: Serialize + ?Sized>(seq: u64, service_method: &str, args: &A) -> crate::core::Result<Self> {
        Ok(Message::Request {
            seq,
            service_method: service_method.to_string(),
            body: encode_body(args)?,
        })
    }

    /// Builds a failed response frame
    pub fn failure(seq: u64, service_method: impl Into<String>, error: impl Into<String>) -> Self {
        Message::Response {
            seq,
            service_method: service_method.into(),
            error: Some(error.into()),
            body: Vec::new(),
        }
    }

    /// Returns the sequence number of the frame
    pub fn seq(&self) -> u64 {
        match self {
            Message::Request { seq, .. } | Message::Response { seq, .. } => *seq,
        }
    }
}

/// Encodes an args or reply value into a frame body
pub fn encode_body<T: Serialize + ?Sized>(value: &T) -> crate::core::Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| crate::core::Error::protocol(format!("Failed to encode body: {}", e)))
}

/// Decodes an args or reply value from a frame body
pub fn decode_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> crate::core::Result<T> {
    bincode::deserialize(body)
        .map_err(|e| crate::core::Error::protocol(format!("Failed to decode body: {}", e)))
}
