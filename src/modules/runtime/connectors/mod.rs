//! Database connectors for sqlwrap
//!
//! One connector per driver: ODBC (odbc-api) for the `odbc` and `dsn`
//! backends, tiberius for native MSSQL, and sqlx for MySQL and PostgreSQL.
//! Each driver sits behind a cargo feature of the same name.

mod factory;
#[cfg(feature = "mssql")]
mod mssql;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "odbc")]
mod odbc;
#[cfg(feature = "postgres")]
mod postgres;
mod traits;

pub use factory::{connect, driver_available, driver_feature, odbc_connection_strings};
#[cfg(feature = "mssql")]
pub use mssql::MssqlConnector;
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnector;
#[cfg(feature = "odbc")]
pub use odbc::OdbcConnector;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
pub use traits::{Connector, ResultSet, ResultSets};
