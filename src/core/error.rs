use std::io;
use thiserror::Error;

/// Custom error types for rpcx
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection refused: {address}")]
    ConnectionRefused {
        /// Address the dial was attempted against
        address: String,
    },

    #[error("null params")]
    NullArguments,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("connection is shut down")]
    ConnectionClosed,

    #[error("{0}")]
    Remote(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("{0}")]
    Service(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new connection refused error
    pub fn refused(address: impl Into<String>) -> Self {
        Error::ConnectionRefused {
            address: address.into(),
        }
    }

    /// Creates a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Creates a new remote error, as reported by the serving side
    pub fn remote(msg: impl Into<String>) -> Self {
        Error::Remote(msg.into())
    }

    /// Creates a new registration error
    pub fn registration(msg: impl Into<String>) -> Self {
        Error::Registration(msg.into())
    }

    /// Creates a new service error, returned by a method handler
    pub fn service(msg: impl Into<String>) -> Self {
        Error::Service(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error means the connection itself is no longer usable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Protocol(_) | Error::ConnectionClosed
        )
    }
}
