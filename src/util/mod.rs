//! Utility module
//!
//! Small helpers used across the crate.

use crate::core::{Error, Result};

/// Returns the last path segment of a type's name, without generics.
///
/// `my_app::handlers::Arith` becomes `Arith`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Installs a global `fmt` subscriber at the given level.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(level: tracing::Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install logger: {}", e)))
}
