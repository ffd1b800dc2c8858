use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{Error, Result, PING_METHOD, TICK_METHOD};
use crate::protocol::{PingArgs, PingReply, TickArgs, TickReply};
use super::Client;

/// Args of the heartbeat call that failed
#[derive(Debug, Clone, Copy)]
pub enum HeartbeatArgs<'a> {
    Ping(&'a PingArgs),
    Tick(&'a TickArgs),
}

/// Called with the failing call's args and error
pub type ErrorHandler = Arc<dyn Fn(&Client, HeartbeatArgs<'_>, &Error) + Send + Sync>;

/// Called after every ping, successful or not
pub type PingHandler = Arc<dyn Fn(&Client, &mut PingArgs, &mut PingReply, Option<&Error>) + Send + Sync>;

/// Called after a successful tick
pub type TickHandler = Arc<dyn Fn(&Client, &mut TickArgs, &mut TickReply, Option<&Error>) + Send + Sync>;

impl Client {
    /// Pings the server once.
    ///
    /// With a ping handler set, the handler gets the outcome and nothing
    /// else runs. Otherwise the error handler, if any, is called on
    /// failure. There is no retry.
    pub async fn ping(&self) {
        let mut ping = PingArgs::now();
        let mut pong = PingReply::default();

        let result = self.call(PING_METHOD, Some(&ping), Some(&mut pong)).await;

        if let Some(handler) = &self.ping_handler {
            handler(self, &mut ping, &mut pong, result.as_ref().err());
            return;
        }

        if let (Err(err), Some(handler)) = (&result, &self.error_handler) {
            handler(self, HeartbeatArgs::Ping(&ping), err);
        }
    }

    /// Replaces any pending tick, waits one `interval`, then sends a
    /// single tick and returns.
    ///
    /// It fires once per call; callers wanting a steady heartbeat call it
    /// again. A failed tick goes to the error handler, or to the log sink
    /// when there is none; the tick handler only sees successes.
    /// `stop_tick` from another task makes a pending call return without
    /// sending. Fails only for a zero interval.
    pub async fn start_tick(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::config("tick interval must be non-zero"));
        }

        self.stop_tick();
        let token = CancellationToken::new();
        *self.ticker.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        tokio::select! {
            _ = token.cancelled() => {
                debug!(address = %self.address(), "tick stopped before firing");
                return Ok(());
            }
            _ = sleep(interval) => {}
        }

        let mut args = TickArgs::now();
        let mut reply = TickReply::default();

        if let Err(err) = self.call(TICK_METHOD, Some(&args), Some(&mut reply)).await {
            match &self.error_handler {
                Some(handler) => handler(self, HeartbeatArgs::Tick(&args), &err),
                None => self.log_tick_error(&err),
            }
            return Ok(());
        }

        if let Some(handler) = &self.tick_handler {
            handler(self, &mut args, &mut reply, None);
        }

        Ok(())
    }

    /// Cancels the pending tick, if any. Idempotent.
    pub fn stop_tick(&self) {
        if let Some(token) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }

    fn log_tick_error(&self, err: &Error) {
        let log = || warn!(address = %self.address(), error = %err, "[RPCX TICK ERROR]");
        match &self.log_sink {
            Some(sink) => tracing::dispatcher::with_default(sink, log),
            None => log(),
        }
    }
}
