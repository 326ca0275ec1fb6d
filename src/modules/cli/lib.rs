//! sqlwrap CLI
//!
//! Command-line front end for the connection wrapper:
//! - query: run one statement (inline or from a templated `.sql` file)
//! - proc: call a stored procedure
//! - resolve: print the host a logical server resolves to

pub mod commands;
mod error;
mod output;

pub use commands::{Cli, Commands};
pub use error::CliError;
pub use output::OutputFormat;
