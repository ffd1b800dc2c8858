//! rpcx client
//!
//! A `Client` owns at most one connection to its configured address. The
//! connection is dialed lazily on first use; concurrent first calls are
//! serialized so only one dial happens.

mod heartbeat;

pub use self::heartbeat::{ErrorHandler, HeartbeatArgs, PingHandler, TickHandler};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{ClientConfig, Error, Result};
use crate::network::{self, Connection};
use crate::protocol::{decode_body, PingArgs, PingReply, TickArgs, TickReply};

/// RPC client for one server address
pub struct Client {
    /// Connection settings
    config: ClientConfig,
    /// Current connection handle, if any
    connection: RwLock<Option<Arc<Connection>>>,
    /// Held while dialing
    connection_lock: AsyncMutex<()>,
    /// Cancels the pending tick, if any
    ticker: Mutex<Option<CancellationToken>>,
    error_handler: Option<ErrorHandler>,
    ping_handler: Option<PingHandler>,
    tick_handler: Option<TickHandler>,
    /// Where tick errors go when no error handler is set
    log_sink: Option<tracing::Dispatch>,
}

impl Client {
    /// Creates a client for `address` with default settings
    pub fn new(address: impl Into<String>) -> Self {
        Client::with_config(ClientConfig::new(address))
    }

    /// Creates a client from a full configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Client {
            config,
            connection: RwLock::new(None),
            connection_lock: AsyncMutex::new(()),
            ticker: Mutex::new(None),
            error_handler: None,
            ping_handler: None,
            tick_handler: None,
            log_sink: None,
        }
    }

    /// Sets the handler for heartbeat failures
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Client, HeartbeatArgs<'_>, &Error) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the handler for ping results. It sees every outcome, so the
    /// error handler is never called for pings once this is set.
    pub fn with_ping_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Client, &mut PingArgs, &mut PingReply, Option<&Error>) + Send + Sync + 'static,
    {
        self.ping_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the handler for successful ticks
    pub fn with_tick_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Client, &mut TickArgs, &mut TickReply, Option<&Error>) + Send + Sync + 'static,
    {
        self.tick_handler = Some(Arc::new(handler));
        self
    }

    /// Routes the tick error fallback to `sink` instead of the default
    /// `tracing` dispatcher
    pub fn with_log_sink(mut self, sink: tracing::Dispatch) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Returns the configured server address
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Returns the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns whether a connection handle currently exists
    pub fn is_connected(&self) -> bool {
        self.current_connection().is_some()
    }

    /// Dials the server unless a connection already exists.
    ///
    /// Fails with `ConnectionRefused` if the dial fails.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let _guard = self.connection_lock.lock().await;

        // Another caller may have finished dialing while we waited
        if self.is_connected() {
            return Ok(());
        }

        let keep_alive = self.config.keep_alive.then_some(self.config.keep_alive_period);
        let stream = network::dial(&self.config.address, keep_alive).await?;
        debug!(address = %self.config.address, "connected");

        let connection = Arc::new(Connection::new(stream, self.config.address.clone()));
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = Some(connection);
        Ok(())
    }

    /// Drops the current connection, healthy or not, and dials again
    pub async fn reconnect(&self) -> Result<()> {
        self.connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.connect().await
    }

    /// Calls `service_method` with `args`, decoding the answer into `reply`.
    ///
    /// Both `args` and `reply` must be given, otherwise the call fails with
    /// `NullArguments` before anything touches the network. Errors
    /// reported by the server are returned as `Error::Remote`.
    pub async fn call<A, R>(&self, service_method: &str, args: Option<&A>, reply: Option<&mut R>) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (args, reply) = match (args, reply) {
            (Some(args), Some(reply)) => (args, reply),
            _ => return Err(Error::NullArguments),
        };

        let connection = match self.current_connection() {
            Some(connection) => connection,
            None => {
                self.connect().await?;
                self.current_connection().ok_or(Error::ConnectionClosed)?
            }
        };

        match connection.call(service_method, args).await {
            Ok(body) => {
                *reply = decode_body(&body)?;
                Ok(())
            }
            Err(err) => {
                if self.config.reconnect_on_error && err.is_transport() {
                    debug!(address = connection.address(), error = %err, "dropping failed connection");
                    self.discard(&connection);
                }
                Err(err)
            }
        }
    }

    fn current_connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops `connection` if it is still the current handle
    fn discard(&self, connection: &Arc<Connection>) {
        let mut current = self.connection.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, connection)) {
            *current = None;
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop_tick();
    }
}
