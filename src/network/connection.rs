use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::core::{Error, Result};
use crate::protocol::{Message, MessageCodec};
use crate::service::Registry;

/// Client side of one open rpcx session.
///
/// Calls are serialized on the underlying stream, so responses come back
/// in request order.
pub struct Connection {
    /// Framed stream, held for the whole request/response exchange
    framed: Mutex<Framed<TcpStream, MessageCodec>>,
    /// Address this connection was dialed against
    address: String,
    /// Next request sequence number
    next_seq: AtomicU64,
}

impl Connection {
    /// Wraps an established stream
    pub fn new(stream: TcpStream, address: impl Into<String>) -> Self {
        Connection {
            framed: Mutex::new(Framed::new(stream, MessageCodec::new())),
            address: address.into(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Sends one request carrying `args` and waits for its response body.
    ///
    /// A response carrying an error is returned as `Error::Remote`.
    pub async fn call<A: Serialize + ?Sized>(&self, service_method: &str, args: &A) -> Result<Vec<u8>> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let request = Message::request(seq, service_method, args)?;
        let mut framed = self.framed.lock().await;

        framed.send(request).await?;
        trace!(address = %self.address, seq, service_method, "request sent");

        loop {
            match framed.next().await {
                None => return Err(Error::ConnectionClosed),
                Some(Err(e)) => return Err(e),
                Some(Ok(Message::Response { seq: got, error, body, .. })) if got == seq => {
                    return match error {
                        Some(error) => Err(Error::remote(error)),
                        None => Ok(body),
                    };
                }
                // Left over from a call whose caller stopped waiting
                Some(Ok(other)) => {
                    debug!(address = %self.address, seq = other.seq(), "discarding stale frame");
                }
            }
        }
    }

    /// Returns the address this connection was dialed against
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Serves requests from one accepted stream until the peer hangs up.
///
/// Requests are answered one at a time, in arrival order.
pub async fn serve_connection(stream: TcpStream, registry: Registry) -> Result<()> {
    let peer: Option<SocketAddr> = stream.peer_addr().ok();
    let mut framed = Framed::new(stream, MessageCodec::new());

    while let Some(frame) = framed.next().await {
        let response = match frame? {
            Message::Request { seq, service_method, body } => {
                trace!(?peer, seq, %service_method, "request received");
                match registry.dispatch(&service_method, &body) {
                    Ok(reply) => Message::Response {
                        seq,
                        service_method,
                        error: None,
                        body: reply,
                    },
                    Err(error) => Message::failure(seq, service_method, error),
                }
            }
            Message::Response { seq, service_method, .. } => {
                Message::failure(seq, service_method, "rpc: unexpected response frame from client")
            }
        };

        framed.send(response).await?;
    }

    debug!(?peer, "connection closed by peer");
    Ok(())
}
