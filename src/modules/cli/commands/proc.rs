//! Proc command implementation

use clap::Args;
use serde_json::Value;
use sqlwrap_core::Settings;
use sqlwrap_types::ProcRequest;
use std::io::Write;

use super::connection::ConnectionArgs;
use crate::error::CliError;
use crate::output::{write_output, OutputFormat};

/// Proc command arguments
#[derive(Args, Debug)]
pub struct ProcCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Procedure name, optionally schema-qualified
    #[arg(long)]
    pub name: String,

    /// Positional parameter (JSON value; anything else is sent as a string)
    #[arg(long = "param", value_name = "JSON")]
    pub params: Vec<String>,

    /// Return rows keyed by column name
    #[arg(long)]
    pub dict: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl ProcCommand {
    /// Execute the proc command
    pub fn execute(&self, settings: &Settings, out: &mut dyn Write) -> Result<(), CliError> {
        let request = self.request();
        let mut wrapper = self.connection.open(settings, self.format.as_str())?;

        let output = wrapper.proc(&request)?;
        wrapper.close()?;

        write_output(out, &output, self.format)?;
        Ok(())
    }

    pub fn request(&self) -> ProcRequest {
        let request = self.params.iter().fold(ProcRequest::new(&self.name), |request, raw| {
            request.with_param(
                serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone())),
            )
        });
        if self.dict {
            request.with_dict()
        } else {
            request
        }
    }
}
