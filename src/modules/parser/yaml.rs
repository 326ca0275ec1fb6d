//! YAML configuration parser

use serde::Deserialize;
use sqlwrap_core::{ConnectionSettings, HostMap, Settings, WrapperError};
use std::collections::BTreeMap;

use crate::env::EnvSubstitutor;

/// YAML parser for sqlwrap configuration files
pub struct YamlParser;

/// Legacy schema: the old `hosts` module exported a single `db` mapping of
/// environment to logical name to host, with no driver settings.
#[derive(Debug, Deserialize)]
struct LegacyHosts {
    db: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
}

impl YamlParser {
    /// Parse a YAML string into Settings
    pub fn parse(content: &str) -> Result<Settings, WrapperError> {
        let substituted = EnvSubstitutor::new().substitute(content)?;
        Self::parse_raw(&substituted)
    }

    /// Parse a YAML string without environment variable substitution
    pub fn parse_raw(content: &str) -> Result<Settings, WrapperError> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        if let Ok(legacy) = serde_yaml::from_str::<LegacyHosts>(content) {
            return legacy_to_settings(legacy);
        }

        serde_yaml::from_str::<Settings>(content)
            .map_err(|e| WrapperError::Config(format!("YAML parse error: {}", e)))
    }
}

fn legacy_to_settings(legacy: LegacyHosts) -> Result<Settings, WrapperError> {
    let mut environments: BTreeMap<String, HostMap> = BTreeMap::new();

    for (env, hosts) in legacy.db {
        let mut map = HostMap::new();
        for (server, host) in hosts {
            let host = yaml_scalar_to_string(host).ok_or_else(|| {
                WrapperError::Config(format!(
                    "Host for '{}.{}' must be a scalar value",
                    env, server
                ))
            })?;
            map.insert(server, host);
        }
        environments.insert(env, map);
    }

    Ok(Settings {
        environments,
        connection: ConnectionSettings::default(),
    })
}

fn yaml_scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
