//! Domain models for sqlwrap configuration

mod config;
mod model;
mod target;
mod types;

pub use config::{Credentials, Password, WrapperConfig};
pub use model::{HostMap, Settings};
pub use target::{ConnectionTarget, OdbcAuth};
pub use types::{ConnectionSettings, DEFAULT_ODBC_DRIVER, DEFAULT_ODBC_FALLBACK_DRIVER};
