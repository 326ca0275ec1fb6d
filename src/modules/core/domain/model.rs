//! Root settings model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ConnectionSettings;

/// Logical server name to physical host, for one environment
pub type HostMap = BTreeMap<String, String>;

/// Root configuration that represents an sqlwrap configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Known hosts per environment
    #[serde(default)]
    pub environments: BTreeMap<String, HostMap>,

    /// Driver-level connection settings
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl Settings {
    /// Create settings with no known hosts
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host for a logical server name
    pub fn with_host(
        mut self,
        env: impl Into<String>,
        server: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        self.environments
            .entry(env.into())
            .or_default()
            .insert(server.into(), host.into());
        self
    }

    /// Find the configured host for a logical server name
    pub fn find_host(&self, env: &str, server: &str) -> Option<&str> {
        self.environments
            .get(env)
            .and_then(|hosts| hosts.get(server))
            .map(String::as_str)
    }

    /// Names of all configured environments
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_new() {
        let settings = Settings::new();
        assert!(settings.environments.is_empty());
        assert_eq!(settings.connection, ConnectionSettings::default());
    }

    #[test]
    fn test_find_host() {
        let settings = Settings::new()
            .with_host("prd", "apollo", "apollo-prd.db.example.net")
            .with_host("uat", "apollo", "apollo-uat.db.example.net");

        assert_eq!(
            settings.find_host("prd", "apollo"),
            Some("apollo-prd.db.example.net")
        );
        assert_eq!(settings.find_host("dev", "apollo"), None);
        assert_eq!(settings.find_host("prd", "eagle"), None);
        assert_eq!(settings.environment_names(), vec!["prd", "uat"]);
    }
}
