//! Configuration parsing for sqlwrap
//!
//! This crate handles parsing of the YAML configuration file (server
//! registry seed and driver settings), validation, environment variable
//! substitution, and the `[[TOKEN]]` templating used for SQL files.

pub mod env;
pub mod sql;
pub mod validator;
pub mod yaml;

pub use sql::SqlTemplate;
pub use validator::ConfigValidator;
pub use yaml::YamlParser;

use sqlwrap_core::{Settings, WrapperError};
use std::path::Path;

/// Parse a configuration file from a path
pub fn parse_file(path: impl AsRef<Path>) -> Result<Settings, WrapperError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        WrapperError::Config(format!("Failed to read file '{}': {}", path.display(), e))
    })?;

    parse_string(&content)
}

/// Parse a configuration file, or fall back to defaults if it does not exist
pub fn parse_file_or_default(path: impl AsRef<Path>) -> Result<Settings, WrapperError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No configuration at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    parse_file(path)
}

/// Parse a configuration from a string
pub fn parse_string(content: &str) -> Result<Settings, WrapperError> {
    let settings = YamlParser::parse(content)?;

    ConfigValidator::new().validate(&settings)?;

    Ok(settings)
}
