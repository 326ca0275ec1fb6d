//! Query command implementation

use clap::{ArgGroup, Args};
use sqlwrap_core::{Settings, WrapperError};
use sqlwrap_parser::SqlTemplate;
use sqlwrap_types::QueryRequest;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use super::connection::{parse_params, ConnectionArgs};
use crate::error::CliError;
use crate::output::{write_output, OutputFormat};

/// Query command arguments
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["sql", "sql_file"])))]
pub struct QueryCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// SQL text
    #[arg(long)]
    pub sql: Option<String>,

    /// File holding the SQL text; line breaks are collapsed to spaces
    #[arg(long, value_name = "PATH")]
    pub sql_file: Option<PathBuf>,

    /// Value for the `[[PROCESSDATE]]` token
    #[arg(long, value_name = "DATE")]
    pub process_date: Option<String>,

    /// Values for `[[0]]`, `[[1]]`, ... in order
    #[arg(long = "arg", value_name = "VALUE")]
    pub args: Vec<String>,

    /// Run without fetching rows (DML)
    #[arg(long)]
    pub no_results: bool,

    /// Return rows keyed by column name
    #[arg(long)]
    pub dict: bool,

    /// Switch to this database before running the statement
    #[arg(long, value_name = "DB")]
    pub use_db: Option<String>,

    /// Bound parameter (JSON value, or a JSON object for named parameters)
    #[arg(long = "param", value_name = "JSON")]
    pub params: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl QueryCommand {
    /// Execute the query command
    pub fn execute(&self, settings: &Settings, out: &mut dyn Write) -> Result<(), CliError> {
        let request = self.request()?;
        let mut wrapper = self.connection.open(settings, self.format.as_str())?;

        let output = wrapper.query(&request)?;
        wrapper.close()?;

        write_output(out, &output, self.format)?;
        Ok(())
    }

    /// Render the SQL template
    pub fn render_sql(&self) -> Result<String, WrapperError> {
        let template = match (&self.sql, &self.sql_file) {
            (Some(sql), _) => SqlTemplate::new(sql),
            (None, Some(path)) => {
                debug!("Loading SQL from: {}", path.display());
                SqlTemplate::load(path)?
            }
            (None, None) => {
                return Err(WrapperError::Config(
                    "one of --sql or --sql-file is required".to_string(),
                ))
            }
        };

        let template = match &self.process_date {
            Some(date) => template.with_process_date(date),
            None => template,
        };
        template.with_args(&self.args).render_strict()
    }

    /// Build the request sent to the wrapper
    pub fn request(&self) -> Result<QueryRequest, CliError> {
        let mut request = QueryRequest::new(self.render_sql()?).with_results(!self.no_results);
        if self.dict {
            request = request.with_dict();
        }
        if let Some(db) = &self.use_db {
            request = request.with_db(db);
        }
        if let Some(params) = parse_params(&self.params)? {
            request = request.with_params(params);
        }
        Ok(request)
    }
}
