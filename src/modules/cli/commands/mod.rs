//! CLI commands

mod completion;
mod connection;
mod proc;
mod query;
mod resolve;

pub use completion::CompletionCommand;
pub use connection::{parse_params, ConnectionArgs};
pub use proc::ProcCommand;
pub use query::QueryCommand;
pub use resolve::ResolveCommand;

use clap::{Parser, Subcommand};
use sqlwrap_core::{Settings, WrapperError};
use sqlwrap_parser::{parse_file, parse_file_or_default};

/// Configuration file used when `-f` is not given
pub const DEFAULT_CONFIG: &str = "sqlwrap.yaml";

/// sqlwrap - run SQL against ODBC, MSSQL, MySQL and Postgres servers
#[derive(Parser, Debug)]
#[command(name = "sqlwrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    ///
    /// A *global* option, so it can follow the subcommand,
    /// e.g. `sqlwrap query -f jobs.yaml ...`.
    #[arg(
        short = 'f',
        long = "file",
        global = true,
        default_value = DEFAULT_CONFIG
    )]
    pub config: String,

    /// Alias for `-f/--file`
    #[arg(short = 'c', long = "config", global = true, hide = true)]
    pub config_compat: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a statement and print its rows
    Query(QueryCommand),

    /// Call a stored procedure and print its rows
    Proc(ProcCommand),

    /// Print the host a logical server resolves to
    Resolve(ResolveCommand),

    /// Generate shell completions
    #[command(hide = true)]
    Completion(CompletionCommand),
}

impl Cli {
    /// Effective configuration path, accounting for compat flags.
    pub fn config_path(&self) -> &str {
        self.config_compat.as_deref().unwrap_or(&self.config)
    }

    /// Load the configuration file
    ///
    /// A missing default file yields empty settings; an explicit path must exist.
    pub fn load_settings(&self) -> Result<Settings, WrapperError> {
        let path = self.config_path();
        if self.config_compat.is_none() && path == DEFAULT_CONFIG {
            parse_file_or_default(path)
        } else {
            parse_file(path)
        }
    }
}
