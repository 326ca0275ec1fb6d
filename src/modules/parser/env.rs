//! Environment variable substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sqlwrap_core::WrapperError;

/// Regex pattern for environment variable placeholders: {{ env.VAR_NAME }}
static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid env pattern")
});

/// Environment variable substitutor; any unresolved placeholder is an error
pub struct EnvSubstitutor;

impl EnvSubstitutor {
    pub fn new() -> Self {
        Self
    }

    /// Substitute placeholders from the process environment
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn substitute(&self, content: &str) -> Result<String, WrapperError> {
        let _ = dotenvy::dotenv();
        self.substitute_with(content, |name| std::env::var(name).ok())
    }

    /// Substitute placeholders using `lookup` to resolve variable names
    pub fn substitute_with<F>(&self, content: &str, lookup: F) -> Result<String, WrapperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing: Vec<String> = Vec::new();

        let result = ENV_PATTERN.replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(WrapperError::EnvVarNotFound(missing.join(", ")));
        }

        Ok(result.into_owned())
    }
}

impl Default for EnvSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}
