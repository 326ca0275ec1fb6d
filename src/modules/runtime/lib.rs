//! Runtime for sqlwrap
//!
//! This crate resolves logical servers to hosts, opens database connections
//! through the compiled-in drivers, and exposes them behind the blocking
//! [`SqlWrapper`].

pub mod connectors;
pub mod executor;
mod registry;
#[cfg(test)]
mod testing;
mod wrapper;

pub use connectors::{Connector, ResultSet, ResultSets};
pub use executor::RequestExecutor;
pub use registry::ServerRegistry;
pub use wrapper::SqlWrapper;
