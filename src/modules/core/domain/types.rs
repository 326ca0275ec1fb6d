//! Connection settings shared by every wrapper in a process

use serde::{Deserialize, Serialize};

/// Primary ODBC driver
pub const DEFAULT_ODBC_DRIVER: &str = "{SQL Server}";

/// Driver tried once when the primary ODBC driver fails to connect
pub const DEFAULT_ODBC_FALLBACK_DRIVER: &str = "{FreeTDS}";

fn default_odbc_fallback_driver() -> Option<String> {
    Some(DEFAULT_ODBC_FALLBACK_DRIVER.to_string())
}

/// Driver-level connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Windows domain used to qualify SQL Server usernames (`DOMAIN\user`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// ODBC driver name (default: `{SQL Server}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odbc_driver: Option<String>,

    /// Alternate ODBC driver; an explicit `null` disables the fallback
    #[serde(default = "default_odbc_fallback_driver")]
    pub odbc_fallback_driver: Option<String>,

    /// Accept the SQL Server certificate without validation (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_server_certificate: Option<bool>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            domain: None,
            odbc_driver: None,
            odbc_fallback_driver: default_odbc_fallback_driver(),
            trust_server_certificate: None,
        }
    }
}

impl ConnectionSettings {
    /// ODBC driver with default fallback
    pub fn odbc_driver(&self) -> &str {
        self.odbc_driver.as_deref().unwrap_or(DEFAULT_ODBC_DRIVER)
    }

    /// Alternate ODBC driver, if the fallback is enabled
    pub fn odbc_fallback_driver(&self) -> Option<&str> {
        self.odbc_fallback_driver
            .as_deref()
            .filter(|driver| !driver.is_empty())
    }

    /// Certificate trust with default fallback
    pub fn trust_server_certificate(&self) -> bool {
        self.trust_server_certificate.unwrap_or(true)
    }

    /// Qualify a SQL Server username with the configured domain
    pub fn qualify_user(&self, user: &str) -> String {
        match self.domain.as_deref().filter(|d| !d.is_empty()) {
            Some(domain) if !user.contains('\\') => format!("{}\\{}", domain, user),
            _ => user.to_string(),
        }
    }
}
