//! SQL file loading and `[[TOKEN]]` templating
//!
//! Batch jobs keep their statements in `.sql` files containing literal
//! tokens: `[[PROCESSDATE]]` for the business date and `[[0]]`, `[[1]]`, ...
//! for positional job arguments. Tokens are replaced with single-quoted
//! literals before the statement reaches a wrapper.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sqlwrap_core::WrapperError;
use std::path::Path;

/// Regex pattern for template tokens: [[PROCESSDATE]], [[0]], [[1]], ...
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([A-Z_]+|[0-9]+)\]\]").expect("valid token pattern"));

const PROCESS_DATE_TOKEN: &str = "PROCESSDATE";

/// SQL text with pending token substitutions
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTemplate {
    text: String,
    process_date: Option<String>,
    args: Vec<String>,
}

impl SqlTemplate {
    /// Create a template from SQL text, collapsing line breaks to spaces
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: collapse_lines(text.as_ref()),
            process_date: None,
            args: Vec::new(),
        }
    }

    /// Load a template from a `.sql` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WrapperError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WrapperError::Template(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Ok(Self::new(text))
    }

    /// Value for `[[PROCESSDATE]]`
    pub fn with_process_date(mut self, date: impl Into<String>) -> Self {
        self.process_date = Some(date.into());
        self
    }

    /// Append a value for the next positional token
    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Values for `[[0]]`, `[[1]]`, ... in order
    pub fn with_args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Values from a comma-separated list; blank entries are skipped
    pub fn with_csv_args(self, csv: &str) -> Self {
        let values: Vec<String> = csv
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        self.with_args(values)
    }

    /// Tokens in the text that no supplied value will replace
    pub fn unresolved_tokens(&self) -> Vec<String> {
        TOKEN_PATTERN
            .captures_iter(&self.text)
            .filter(|caps| self.value_for(&caps[1]).is_none())
            .map(|caps| caps[0].to_string())
            .collect()
    }

    /// Render the statement, leaving unknown tokens untouched
    pub fn render(&self) -> String {
        TOKEN_PATTERN
            .replace_all(&self.text, |caps: &Captures| match self.value_for(&caps[1]) {
                Some(value) => quote_literal(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render the statement, failing if any token is left unresolved
    pub fn render_strict(&self) -> Result<String, WrapperError> {
        let unresolved = self.unresolved_tokens();
        if !unresolved.is_empty() {
            return Err(WrapperError::Template(format!(
                "Unresolved tokens: {}",
                unresolved.join(", ")
            )));
        }
        Ok(self.render())
    }

    fn value_for(&self, token: &str) -> Option<&str> {
        if token == PROCESS_DATE_TOKEN {
            return self.process_date.as_deref();
        }
        token
            .parse::<usize>()
            .ok()
            .and_then(|index| self.args.get(index))
            .map(String::as_str)
    }
}

fn collapse_lines(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}

/// Quote a value as a SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
