//! Method dispatch for the server side
//!
//! The registry turns "Service.Method" names into handler calls; the
//! internal service answers the heartbeat methods and forwards them to an
//! application delegate.

mod internal;
mod registry;

pub use self::internal::{InternalService, ServerDelegate};
pub use self::registry::{MethodSet, Registry, Service};
