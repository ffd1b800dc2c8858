//! Network plumbing module
//!
//! Dialing, the client-side connection handle, and the per-connection
//! serve loop used by the server.

mod connection;

pub use self::connection::{serve_connection, Connection};

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tracing::debug;

use crate::core::{Error, Result};

/// Dials `address` and configures the socket.
///
/// Any dial failure, including name resolution, is reported as
/// `ConnectionRefused` carrying the address. `keep_alive` enables TCP
/// keep-alive with the given idle period.
pub async fn dial(address: &str, keep_alive: Option<Duration>) -> Result<TcpStream> {
    let stream = TcpStream::connect(address).await.map_err(|e| {
        debug!(address, error = %e, "dial failed");
        Error::refused(address)
    })?;

    stream.set_nodelay(true)?;

    if let Some(period) = keep_alive {
        let keepalive = TcpKeepalive::new().with_time(period);
        SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_with_keep_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let stream = dial(&addr, Some(Duration::from_secs(30))).await.unwrap();
        assert!(SockRef::from(&stream).keepalive().unwrap());
        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_dial_refused_carries_address() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match dial(&addr, None).await {
            Err(Error::ConnectionRefused { address }) => assert_eq!(address, addr),
            other => panic!("expected refusal, got {:?}", other.map(|_| ())),
        }
    }
}
