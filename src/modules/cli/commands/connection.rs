//! Connection flags shared by `query` and `proc`

use clap::Args;
use sqlwrap_core::{Credentials, Password, Settings, WrapperConfig, WrapperError};
use sqlwrap_runtime::{ServerRegistry, SqlWrapper};
use sqlwrap_types::{Backend, Params};
use tracing::debug;

use crate::error::CliError;

/// Which database to connect to, and as whom
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Environment name (e.g. prd, uat)
    #[arg(long)]
    pub env: String,

    /// Logical server name, or the DSN name for `--method dsn`
    #[arg(long)]
    pub server: String,

    /// Backend selector: odbc, dsn, native-mssql, native-mysql or postgres
    #[arg(long)]
    pub method: Backend,

    /// Initial database
    #[arg(long)]
    pub db: Option<String>,

    /// Username (omit for integrated authentication over ODBC)
    #[arg(long)]
    pub user: Option<String>,

    /// Password
    #[arg(long)]
    pub password: Option<String>,

    /// Log failed statements at warn level
    #[arg(long)]
    pub debug: bool,
}

impl ConnectionArgs {
    /// Wrapper configuration for these flags
    pub fn config(&self) -> WrapperConfig {
        let mut config = WrapperConfig::new(&self.env, &self.server, self.method).with_debug(self.debug);
        if let Some(db) = &self.db {
            config = config.with_db(db);
        }
        if self.user.is_some() || self.password.is_some() {
            config = config.with_credentials(Credentials {
                user: self.user.clone(),
                password: self.password.clone().map(Password::new),
            });
        }
        config
    }

    /// Open a wrapper using the registry seeded from `settings`
    pub fn open(&self, settings: &Settings, format: &str) -> Result<SqlWrapper, WrapperError> {
        let registry = ServerRegistry::from_settings(settings);
        let config = self.config().with_format(format);
        debug!(env = %self.env, server = %self.server, method = %self.method, "opening wrapper");
        SqlWrapper::connect(config, &registry, &settings.connection)
    }
}

/// Interpret `--param` values
///
/// Each value is parsed as JSON, falling back to a plain string. A single
/// JSON object supplies named parameters; anything else is positional.
pub fn parse_params(raw: &[String]) -> Result<Option<Params>, CliError> {
    let values: Vec<serde_json::Value> = raw
        .iter()
        .map(|value| {
            serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.clone()))
        })
        .collect();

    match values.as_slice() {
        [] => Ok(None),
        [serde_json::Value::Object(map)] => Ok(Some(Params::Named(map.clone()))),
        values if values.iter().any(|v| v.is_object()) => Err(CliError::Usage(
            "named parameters must be given as a single JSON object".to_string(),
        )),
        values => Ok(Some(Params::Positional(values.to_vec()))),
    }
}
