use std::sync::Arc;

use crate::core::Result;
use crate::protocol::{PingArgs, PingReply, TickArgs, TickReply};
use super::registry::{MethodSet, Service};

/// Application hooks for the built-in heartbeat methods
pub trait ServerDelegate: Send + Sync + 'static {
    /// Handles a ping; the reply arrives already stamped
    fn ping(&self, args: &PingArgs, reply: &mut PingReply) -> Result<()>;

    /// Handles a tick; the reply arrives already stamped
    fn tick(&self, args: &TickArgs, reply: &mut TickReply) -> Result<()>;
}

/// Built-in service answering `PING` and `TICK`.
///
/// Both timestamps of the reply are set before the delegate runs, so a
/// delegate may overwrite them.
pub struct InternalService {
    delegate: Option<Arc<dyn ServerDelegate>>,
}

impl InternalService {
    /// Creates the service, forwarding to `delegate` when present
    pub fn new(delegate: Option<Arc<dyn ServerDelegate>>) -> Self {
        InternalService { delegate }
    }

    /// Answers a ping
    pub fn ping(&self, args: &PingArgs, reply: &mut PingReply) -> Result<()> {
        reply.stamp();

        match &self.delegate {
            Some(delegate) => delegate.ping(args, reply),
            None => Ok(()),
        }
    }

    /// Answers a tick
    pub fn tick(&self, args: &TickArgs, reply: &mut TickReply) -> Result<()> {
        reply.stamp();

        match &self.delegate {
            Some(delegate) => delegate.tick(args, reply),
            None => Ok(()),
        }
    }
}

impl Service for InternalService {
    fn methods(self: Arc<Self>) -> MethodSet {
        let pinger = Arc::clone(&self);
        let ticker = self;

        MethodSet::new()
            .method("PING", move |args: &PingArgs, reply: &mut PingReply| pinger.ping(args, reply))
            .method("TICK", move |args: &TickArgs, reply: &mut TickReply| ticker.tick(args, reply))
    }
}
