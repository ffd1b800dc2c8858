//! rpcx server
//!
//! The server owns a method registry and runs an accept loop with three
//! states:
//!
//! - `Running`: connections are accepted and each is served on its own task.
//! - `Paused`: the listener stays bound but nothing is accepted; new
//!   connections wait in the backlog until `resume`.
//! - `Stopped`: the loop returns and the listener is dropped. A later
//!   `run`/`serve` binds a fresh listener.
//!
//! The status lives in a `watch` channel, which doubles as the signal that
//! wakes the loop when `pause`, `resume` or `stop` change it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::{Result, ServerStatus, INTERNAL_SERVICE};
use crate::network::serve_connection;
use crate::service::{InternalService, Registry, ServerDelegate, Service};

/// Registry plus the status switch, built on first use
struct Dispatch {
    registry: Registry,
    status_switch: watch::Sender<ServerStatus>,
}

/// Shared state between server handles
struct SharedState {
    /// Application hooks for `PING`/`TICK`
    delegate: Option<Arc<dyn ServerDelegate>>,
    dispatch: OnceLock<Dispatch>,
    /// Address of the listener while a loop is active
    local_addr: Mutex<Option<SocketAddr>>,
}

/// RPC server handle. Clones share the same server.
#[derive(Clone)]
pub struct Server {
    shared: Arc<SharedState>,
}

impl Default for Server {
    fn default() -> Self {
        Server::new()
    }
}

impl Server {
    /// Creates a server without a delegate; heartbeat calls are answered
    /// with timestamps only
    pub fn new() -> Self {
        Server::build(None)
    }

    /// Creates a server forwarding heartbeat calls to `delegate`
    pub fn with_delegate<D: ServerDelegate>(delegate: D) -> Self {
        Server::build(Some(Arc::new(delegate)))
    }

    fn build(delegate: Option<Arc<dyn ServerDelegate>>) -> Self {
        Server {
            shared: Arc::new(SharedState {
                delegate,
                dispatch: OnceLock::new(),
                local_addr: Mutex::new(None),
            }),
        }
    }

    fn dispatch(&self) -> &Dispatch {
        self.shared.dispatch.get_or_init(|| Dispatch {
            registry: Registry::new(),
            status_switch: watch::Sender::new(ServerStatus::Stopped),
        })
    }

    /// Returns the method registry, creating it on first use
    pub fn rpc_server(&self) -> &Registry {
        &self.dispatch().registry
    }

    /// Returns the current lifecycle state
    pub fn status(&self) -> ServerStatus {
        *self.dispatch().status_switch.borrow()
    }

    /// Returns the bound address while an accept loop is active
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the built-in `PING`/`TICK` service under `RPCX`
    pub fn register_internal_services(&self) -> Result<()> {
        let internal = InternalService::new(self.shared.delegate.clone());
        self.register_services(INTERNAL_SERVICE, internal)
    }

    /// Registers `receiver` under `name`, or under its type name when
    /// `name` is empty
    pub fn register_services<S: Service>(&self, name: &str, receiver: S) -> Result<()> {
        if name.is_empty() {
            self.rpc_server().register(receiver)
        } else {
            self.rpc_server().register_name(name, receiver)
        }
    }

    /// Serves one accepted connection on its own task
    pub fn serve_conn(&self, stream: TcpStream) {
        let registry = self.rpc_server().clone();
        tokio::spawn(async move {
            let peer = stream.peer_addr().ok();
            if let Err(e) = serve_connection(stream, registry).await {
                debug!(?peer, error = %e, "connection ended");
            }
        });
    }

    /// Binds `address` and runs the accept loop until stopped.
    ///
    /// Returns immediately, without binding, unless the server is stopped;
    /// a paused server only leaves `Paused` through `resume`.
    pub async fn run(&self, address: &str) -> Result<()> {
        if self.status() != ServerStatus::Stopped {
            return Ok(());
        }

        let listener = TcpListener::bind(address).await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener until stopped.
    ///
    /// Returns immediately, dropping `listener`, unless the server is
    /// stopped.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let switch = &self.dispatch().status_switch;

        let claimed = switch.send_if_modified(|status| {
            if *status != ServerStatus::Stopped {
                return false;
            }
            *status = ServerStatus::Running;
            true
        });
        if !claimed {
            return Ok(());
        }

        let addr = listener.local_addr().ok();
        self.set_local_addr(addr);
        info!(?addr, "rpcx server running");

        let mut status_rx = switch.subscribe();
        loop {
            let status = *status_rx.borrow_and_update();
            match status {
                ServerStatus::Stopped => break,
                ServerStatus::Paused => {
                    debug!(?addr, "accept loop paused");
                    if status_rx.changed().await.is_err() {
                        break;
                    }
                }
                ServerStatus::Running => {
                    tokio::select! {
                        accepted = listener.accept() => match accepted {
                            Ok((stream, peer)) => {
                                debug!(%peer, "accepted connection");
                                self.serve_conn(stream);
                            }
                            Err(e) => {
                                warn!(?addr, error = %e, "accept failed, stopping");
                                self.stop();
                            }
                        },
                        changed = status_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.set_local_addr(None);
        info!(?addr, "rpcx server stopped");
        Ok(())
    }

    /// Stops accepting new connections. Does not block.
    ///
    /// Only a running server pauses; otherwise this is a no-op.
    pub fn pause(&self) {
        if self.transition(ServerStatus::Running, ServerStatus::Paused) {
            debug!("pause requested");
        }
    }

    /// Resumes a paused server. No-op in any other state.
    pub fn resume(&self) {
        if self.transition(ServerStatus::Paused, ServerStatus::Running) {
            debug!("resume requested");
        }
    }

    /// Stops the accept loop and releases the listener. Connections
    /// already being served are not interrupted. No-op if already stopped.
    pub fn stop(&self) {
        let stopped = self.dispatch().status_switch.send_if_modified(|status| {
            if *status == ServerStatus::Stopped {
                return false;
            }
            *status = ServerStatus::Stopped;
            true
        });
        if stopped {
            debug!("stop requested");
        }
    }

    /// Moves `from` to `to` atomically; returns whether it happened
    fn transition(&self, from: ServerStatus, to: ServerStatus) -> bool {
        self.dispatch().status_switch.send_if_modified(|status| {
            if *status != from {
                return false;
            }
            *status = to;
            true
        })
    }

    fn set_local_addr(&self, addr: Option<SocketAddr>) {
        *self.shared.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = addr;
    }
}
