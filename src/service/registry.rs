use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::core::{Error, Result};
use crate::protocol::{decode_body, encode_body};
use crate::util::short_type_name;

/// Type-erased method: decodes args, runs the handler, encodes the reply
type Handler = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Named methods exposed by one service
#[derive(Clone, Default)]
pub struct MethodSet {
    methods: HashMap<String, Handler>,
}

impl MethodSet {
    /// Creates an empty method set
    pub fn new() -> Self {
        MethodSet::default()
    }

    /// Adds a method.
    ///
    /// The handler gets the decoded args and a reply that starts at
    /// `R::default()`; whatever it leaves in the reply is sent back, unless
    /// it returns an error, in which case only the error is sent.
    pub fn method<A, R, F>(mut self, name: &str, handler: F) -> Self
    where
        A: DeserializeOwned,
        R: Serialize + Default,
        F: Fn(&A, &mut R) -> Result<()> + Send + Sync + 'static,
    {
        let erased: Handler = Arc::new(move |body: &[u8]| {
            let args: A = decode_body(body)?;
            let mut reply = R::default();
            handler(&args, &mut reply)?;
            encode_body(&reply)
        });
        self.methods.insert(name.to_string(), erased);
        self
    }

    /// Returns the number of methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns whether the set has no methods
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Returns whether a method with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Handler> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodSet").field("methods", &names).finish()
    }
}

/// A receiver whose methods can be registered on a server
pub trait Service: Send + Sync + 'static {
    /// Returns the methods this receiver exposes
    fn methods(self: Arc<Self>) -> MethodSet;
}

/// Dispatch registry mapping "Service.Method" names to handlers
#[derive(Clone, Default)]
pub struct Registry {
    services: Arc<RwLock<HashMap<String, MethodSet>>>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a receiver under its own type name
    pub fn register<S: Service>(&self, receiver: S) -> Result<()> {
        self.register_name(short_type_name::<S>(), receiver)
    }

    /// Registers a receiver under an explicit service name
    pub fn register_name<S: Service>(&self, name: &str, receiver: S) -> Result<()> {
        if name.is_empty() || name.contains('.') {
            return Err(Error::registration(format!("invalid service name {:?}", name)));
        }

        let methods = Arc::new(receiver).methods();
        if methods.is_empty() {
            return Err(Error::registration(format!("type {} has no methods", name)));
        }

        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        if services.contains_key(name) {
            return Err(Error::registration(format!("service already defined: {}", name)));
        }

        debug!(service = name, methods = methods.len(), "registered service");
        services.insert(name.to_string(), methods);
        Ok(())
    }

    /// Returns whether a service is registered under this name
    pub fn contains(&self, service: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(service)
    }

    /// Runs one call and returns the encoded reply, or the error text to
    /// report back to the caller.
    pub fn dispatch(&self, service_method: &str, body: &[u8]) -> std::result::Result<Vec<u8>, String> {
        let (service, method) = match service_method.rsplit_once('.') {
            Some((service, method)) if !service.is_empty() && !method.is_empty() => (service, method),
            _ => {
                return Err(format!(
                    "rpc: service/method request ill-formed: {}",
                    service_method
                ))
            }
        };

        let handler = {
            let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
            let methods = services
                .get(service)
                .ok_or_else(|| format!("rpc: can't find service {}", service_method))?;
            methods
                .get(method)
                .ok_or_else(|| format!("rpc: can't find method {}", service_method))?
        };

        handler(body).map_err(|e| e.to_string())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = services.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("services", &names).finish()
    }
}
