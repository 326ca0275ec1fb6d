//! Wrapper configuration record

use serde::{Deserialize, Serialize};
use sqlwrap_types::Backend;
use std::fmt;

use crate::error::WrapperError;

/// A password that never shows up in `Debug` output or logs
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// The clear-text password, for handing to a driver
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

/// Username/password pair
///
/// Either half may be missing; backends that need both reject the pair when
/// the connection target is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<Password>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(Password::new(password)),
        }
    }

    /// Both halves, if both are present
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.expose())),
            _ => None,
        }
    }
}

/// Configuration of one wrapper instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Environment tag (dev, uat, prd, ...)
    pub env: String,

    /// Logical server name, resolved through the server registry
    pub server: String,

    /// Backend selector
    pub method: Backend,

    /// Initial database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Credentials; trusted authentication is used by ODBC when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Report operational failures at warn level instead of debug
    #[serde(default)]
    pub debug: bool,

    /// Response format hint (advisory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl WrapperConfig {
    /// Create a configuration with no database, credentials or format hint
    pub fn new(env: impl Into<String>, server: impl Into<String>, method: Backend) -> Self {
        Self {
            env: env.into(),
            server: server.into(),
            method,
            db: None,
            credentials: None,
            debug: false,
            format: None,
        }
    }

    /// Parse a configuration record from JSON
    ///
    /// Unknown backend selectors and missing fields are configuration errors.
    pub fn from_value(value: serde_json::Value) -> Result<Self, WrapperError> {
        serde_json::from_value(value).map_err(|e| WrapperError::Config(e.to_string()))
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Username to report in connection errors
    pub fn user(&self) -> Option<&str> {
        self.credentials.as_ref().and_then(|c| c.user.as_deref())
    }

    /// Database name, treating an empty string as absent
    pub fn database(&self) -> Option<&str> {
        self.db.as_deref().filter(|db| !db.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_from_value() {
        let config = WrapperConfig::from_value(json!({
            "env": "prd",
            "server": "apollo",
            "method": "pyodbc",
            "db": "worldwide",
            "debug": true,
            "format": "json"
        }))
        .unwrap();
        assert_eq!(config.method, Backend::Odbc);
        assert_eq!(config.database(), Some("worldwide"));
        assert!(config.credentials.is_none());
        assert!(config.debug);
    }

    #[test]
    fn test_unknown_method_is_config_error() {
        let err = WrapperConfig::from_value(json!({
            "env": "prd",
            "server": "apollo",
            "method": "oracle"
        }))
        .unwrap_err();
        assert!(matches!(err, WrapperError::Config(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_credentials_pair() {
        assert_eq!(Credentials::new("u", "p").pair(), Some(("u", "p")));

        let partial = Credentials {
            user: Some("u".to_string()),
            password: None,
        };
        assert_eq!(partial.pair(), None);
    }

    #[test]
    fn test_password_is_redacted() {
        let config = WrapperConfig::new("dev", "pgdev", Backend::Postgres)
            .with_credentials(Credentials::new("batch", "hunter2"));
        let debug = format!("{:?}", config);
        assert!(debug.contains("batch"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(config.user(), Some("batch"));
    }

    #[test]
    fn test_empty_db_is_absent() {
        let config = WrapperConfig::new("dev", "pgdev", Backend::Postgres).with_db("");
        assert_eq!(config.database(), None);
    }
}
