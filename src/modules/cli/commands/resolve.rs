//! Resolve command implementation

use clap::Args;
use sqlwrap_core::Settings;
use sqlwrap_runtime::ServerRegistry;
use std::io::Write;

use crate::error::CliError;

/// Resolve command arguments
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Environment name
    #[arg(long)]
    pub env: String,

    /// Logical server name
    #[arg(long)]
    pub server: String,
}

impl ResolveCommand {
    /// Print the host `server` resolves to in `env`
    pub fn execute(&self, settings: &Settings, out: &mut dyn Write) -> Result<(), CliError> {
        let registry = ServerRegistry::from_settings(settings);
        writeln!(out, "{}", registry.resolve(&self.env, &self.server))?;
        Ok(())
    }
}
