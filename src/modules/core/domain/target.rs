//! Backend-specific connection descriptors

use sqlwrap_types::Backend;

use super::{ConnectionSettings, Password, WrapperConfig};
use crate::error::WrapperError;

/// How an ODBC connection authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OdbcAuth {
    /// Integrated Windows authentication of the running process
    ///
    /// `user` is whatever the configuration named; it only appears in errors.
    Trusted { user: Option<String> },
    /// Explicit, domain-qualified credentials
    Domain { user: String, password: Password },
}

/// Everything a driver needs to open one connection
///
/// Built from a [`WrapperConfig`] and the resolved host. All credential and
/// database requirements are checked here, before any driver is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Odbc {
        host: String,
        port: u16,
        database: Option<String>,
        auth: OdbcAuth,
    },
    Dsn {
        dsn: String,
        user: String,
        password: Password,
    },
    NativeMssql {
        host: String,
        port: u16,
        database: Option<String>,
        user: String,
        password: Password,
    },
    NativeMysql {
        host: String,
        port: u16,
        database: Option<String>,
        user: String,
        password: Password,
    },
    Postgres {
        host: String,
        port: u16,
        database: String,
        user: Option<String>,
        password: Option<Password>,
    },
}

impl ConnectionTarget {
    /// Build the descriptor for `config`, connecting to `host`
    pub fn build(
        config: &WrapperConfig,
        host: &str,
        settings: &ConnectionSettings,
    ) -> Result<Self, WrapperError> {
        let backend = config.method;
        let database = config.database().map(str::to_string);
        let credentials = config.credentials.clone().unwrap_or_default();

        let required_pair = || {
            credentials
                .pair()
                .map(|(user, password)| (user.to_string(), Password::new(password)))
                .ok_or_else(|| {
                    WrapperError::Config(format!(
                        "{}: credentials with \"user\" and \"password\" are required",
                        backend
                    ))
                })
        };

        let target = match backend {
            Backend::Odbc => {
                let auth = match credentials.pair() {
                    Some((user, password)) => OdbcAuth::Domain {
                        user: settings.qualify_user(user),
                        password: Password::new(password),
                    },
                    None => OdbcAuth::Trusted {
                        user: config.user().map(str::to_string),
                    },
                };
                ConnectionTarget::Odbc {
                    host: host.to_string(),
                    port: backend.default_port(),
                    database,
                    auth,
                }
            }
            Backend::Dsn => {
                let (user, password) = required_pair()?;
                ConnectionTarget::Dsn {
                    dsn: config.server.clone(),
                    user,
                    password,
                }
            }
            Backend::NativeMssql => {
                let (user, password) = required_pair()?;
                ConnectionTarget::NativeMssql {
                    host: host.to_string(),
                    port: backend.default_port(),
                    database,
                    user: settings.qualify_user(&user),
                    password,
                }
            }
            Backend::NativeMysql => {
                let (user, password) = required_pair()?;
                ConnectionTarget::NativeMysql {
                    host: host.to_string(),
                    port: backend.default_port(),
                    database,
                    user,
                    password,
                }
            }
            Backend::Postgres => {
                let database = database.ok_or_else(|| {
                    WrapperError::Config(
                        "postgres: \"db\" parameter is required for postgres connections"
                            .to_string(),
                    )
                })?;
                ConnectionTarget::Postgres {
                    host: host.to_string(),
                    port: backend.default_port(),
                    database,
                    user: credentials.user.clone(),
                    password: credentials.password.clone(),
                }
            }
        };

        Ok(target)
    }

    /// Backend this target connects with
    pub fn backend(&self) -> Backend {
        match self {
            ConnectionTarget::Odbc { .. } => Backend::Odbc,
            ConnectionTarget::Dsn { .. } => Backend::Dsn,
            ConnectionTarget::NativeMssql { .. } => Backend::NativeMssql,
            ConnectionTarget::NativeMysql { .. } => Backend::NativeMysql,
            ConnectionTarget::Postgres { .. } => Backend::Postgres,
        }
    }

    /// Host (or data source name) being connected to
    pub fn host(&self) -> &str {
        match self {
            ConnectionTarget::Dsn { dsn, .. } => dsn,
            ConnectionTarget::Odbc { host, .. }
            | ConnectionTarget::NativeMssql { host, .. }
            | ConnectionTarget::NativeMysql { host, .. }
            | ConnectionTarget::Postgres { host, .. } => host,
        }
    }

    /// Username connection errors are attributed to, if any
    pub fn user(&self) -> Option<&str> {
        match self {
            ConnectionTarget::Odbc { auth, .. } => match auth {
                OdbcAuth::Trusted { user } => user.as_deref(),
                OdbcAuth::Domain { user, .. } => Some(user),
            },
            ConnectionTarget::Dsn { user, .. }
            | ConnectionTarget::NativeMssql { user, .. }
            | ConnectionTarget::NativeMysql { user, .. } => Some(user),
            ConnectionTarget::Postgres { user, .. } => user.as_deref(),
        }
    }

    /// ODBC connection string for `driver`; `None` for non-ODBC targets
    ///
    /// DSN targets ignore the driver.
    pub fn odbc_connection_string(&self, driver: &str) -> Option<String> {
        match self {
            ConnectionTarget::Odbc {
                host,
                port,
                database,
                auth,
            } => {
                let mut parts = vec![
                    format!("DRIVER={}", driver),
                    format!("SERVER={}", odbc_value(host)),
                    format!("PORT={}", port),
                ];
                match auth {
                    OdbcAuth::Domain { user, password } => {
                        parts.push(format!("UID={}", odbc_value(user)));
                        parts.push(format!("PWD={}", odbc_value(password.expose())));
                    }
                    OdbcAuth::Trusted { .. } => {
                        parts.push("Trusted_Connection=yes".to_string())
                    }
                }
                if let Some(database) = database {
                    parts.push(format!("DATABASE={}", odbc_value(database)));
                }
                Some(parts.join(";"))
            }
            ConnectionTarget::Dsn {
                dsn,
                user,
                password,
            } => Some(format!(
                "DSN={};UID={};PWD={}",
                odbc_value(dsn),
                odbc_value(user),
                odbc_value(password.expose())
            )),
            _ => None,
        }
    }
}

/// Brace-quote an ODBC attribute value when it contains separators
fn odbc_value(value: &str) -> String {
    if value.contains([';', '{', '}']) || value.starts_with(' ') || value.ends_with(' ') {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}
