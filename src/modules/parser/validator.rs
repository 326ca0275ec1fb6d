//! Configuration validation

use once_cell::sync::Lazy;
use regex::Regex;
use sqlwrap_core::{Settings, WrapperError};

/// Host names and addresses: no whitespace, no connection-string separators
static HOST_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s;{}=]+$").expect("valid host pattern"));

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the entire settings model
    pub fn validate(&self, settings: &Settings) -> Result<(), WrapperError> {
        self.validate_environments(settings)?;
        self.validate_connection(settings)?;
        Ok(())
    }

    /// Validate the host registry seed
    fn validate_environments(&self, settings: &Settings) -> Result<(), WrapperError> {
        for (env, hosts) in &settings.environments {
            if env.trim().is_empty() {
                return Err(WrapperError::Validation(
                    "Environment name cannot be empty".to_string(),
                ));
            }

            for (server, host) in hosts {
                if server.trim().is_empty() {
                    return Err(WrapperError::Validation(format!(
                        "Environment '{}' has a server with an empty name",
                        env
                    )));
                }

                if host.trim().is_empty() {
                    return Err(WrapperError::Validation(format!(
                        "Server '{}.{}' has an empty host",
                        env, server
                    )));
                }

                if !HOST_PATTERN.is_match(host) {
                    return Err(WrapperError::Validation(format!(
                        "Invalid host '{}' for server '{}.{}'",
                        host, env, server
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate driver-level settings
    fn validate_connection(&self, settings: &Settings) -> Result<(), WrapperError> {
        let connection = &settings.connection;

        if let Some(driver) = &connection.odbc_driver {
            if driver.trim().is_empty() {
                return Err(WrapperError::Validation(
                    "ODBC driver name cannot be empty".to_string(),
                ));
            }
        }

        if let Some(domain) = &connection.domain {
            if domain.contains('\\') {
                return Err(WrapperError::Validation(format!(
                    "Domain '{}' must not contain a backslash",
                    domain
                )));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
