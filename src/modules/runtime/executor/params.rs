//! Named parameter binding
//!
//! Statements may name their parameters (`WHERE id = :id`). Drivers only
//! bind positionally, so named tokens are rewritten into the backend's
//! placeholder style and the values are laid out in token order.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use sqlwrap_core::OperationError;
use sqlwrap_types::{Backend, Params};

/// A single-quoted literal, or `:name` preceded by start of text or a
/// character that cannot continue an identifier or a `::` cast
///
/// Literals are matched first so tokens inside them are left alone.
static NAMED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'|(^|[^:A-Za-z0-9_]):([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid named pattern")
});

/// Positional placeholder syntax understood by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@P1`, `@P2`, ...
    AtP,
}

impl PlaceholderStyle {
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Odbc | Backend::Dsn | Backend::NativeMysql => PlaceholderStyle::Question,
            Backend::Postgres => PlaceholderStyle::Dollar,
            Backend::NativeMssql => PlaceholderStyle::AtP,
        }
    }

    /// Placeholder for the 1-based position `n`
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", n),
            PlaceholderStyle::AtP => format!("@P{}", n),
        }
    }
}

/// A statement ready for positional binding
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Produce the statement and positional values for an optional payload
pub fn bind(
    statement: &str,
    params: Option<&Params>,
    style: PlaceholderStyle,
) -> Result<BoundStatement, OperationError> {
    match params {
        None => Ok(BoundStatement {
            sql: statement.to_string(),
            params: Vec::new(),
        }),
        Some(Params::Positional(values)) => Ok(BoundStatement {
            sql: statement.to_string(),
            params: values.clone(),
        }),
        Some(Params::Named(values)) => bind_named(statement, values, style),
    }
}

/// Rewrite `:name` tokens into positional placeholders
///
/// A name used twice is bound twice. A token with no value fails the call.
pub fn bind_named(
    statement: &str,
    values: &Map<String, Value>,
    style: PlaceholderStyle,
) -> Result<BoundStatement, OperationError> {
    let mut params = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    let sql = NAMED_PATTERN.replace_all(statement, |caps: &Captures| {
        let Some(name) = caps.get(2).map(|m| m.as_str()) else {
            return caps[0].to_string();
        };
        match values.get(name) {
            Some(value) => {
                params.push(value.clone());
                format!("{}{}", &caps[1], style.placeholder(params.len()))
            }
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(OperationError::Parameters(format!(
            "no value for named parameter(s): {}",
            missing.join(", ")
        )));
    }

    Ok(BoundStatement {
        sql: sql.into_owned(),
        params,
    })
}

/// Named tokens in a statement, in order of appearance
pub fn named_tokens(statement: &str) -> Vec<String> {
    NAMED_PATTERN
        .captures_iter(statement)
        .filter_map(|caps| caps.get(2).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_question_style() {
        let bound = bind_named(
            "SELECT * FROM report_request WHERE extract = :extract AND d = :date",
            &named(json!({"extract": "EXT001", "date": "2024-01-02"})),
            PlaceholderStyle::Question,
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM report_request WHERE extract = ? AND d = ?"
        );
        assert_eq!(bound.params, vec![json!("EXT001"), json!("2024-01-02")]);
    }

    #[test]
    fn test_numbered_styles_and_repeats() {
        let values = named(json!({"id": 7}));
        let pg = bind_named("SELECT :id, :id", &values, PlaceholderStyle::Dollar).unwrap();
        assert_eq!(pg.sql, "SELECT $1, $2");
        assert_eq!(pg.params, vec![json!(7), json!(7)]);

        let ms = bind_named("EXEC p :id", &values, PlaceholderStyle::AtP).unwrap();
        assert_eq!(ms.sql, "EXEC p @P1");
    }

    #[test]
    fn test_casts_and_times_are_not_parameters() {
        let sql = "SELECT created::date, '12:30' FROM t WHERE id=:id";
        assert_eq!(named_tokens(sql), vec!["id".to_string()]);

        let bound = bind_named(sql, &named(json!({"id": 1})), PlaceholderStyle::Dollar).unwrap();
        assert_eq!(bound.sql, "SELECT created::date, '12:30' FROM t WHERE id=$1");
    }

    #[test]
    fn test_tokens_inside_literals_are_text() {
        let sql = "SELECT * FROM notes WHERE note = ' :x' AND tag <> 'it'':s' AND id = :id";
        assert_eq!(named_tokens(sql), vec!["id".to_string()]);

        let bound = bind_named(sql, &named(json!({"id": 3})), PlaceholderStyle::AtP).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM notes WHERE note = ' :x' AND tag <> 'it'':s' AND id = @P1"
        );
        assert_eq!(bound.params, vec![json!(3)]);
    }

    #[test]
    fn test_leading_token() {
        assert_eq!(named_tokens(":a,:b"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_value() {
        let err = bind_named(
            "SELECT :a, :b, :b",
            &named(json!({"a": 1})),
            PlaceholderStyle::Question,
        )
        .unwrap_err();
        assert_eq!(
            err,
            OperationError::Parameters("no value for named parameter(s): b".to_string())
        );
    }

    #[test]
    fn test_positional_passthrough() {
        let params = Params::Positional(vec![json!(1), json!("x")]);
        let bound = bind("SELECT ?, ?", Some(&params), PlaceholderStyle::Question).unwrap();
        assert_eq!(bound.sql, "SELECT ?, ?");
        assert_eq!(bound.params.len(), 2);

        let bound = bind("SELECT 1", None, PlaceholderStyle::Dollar).unwrap();
        assert!(bound.params.is_empty());
    }

    #[test]
    fn test_style_for_backend() {
        assert_eq!(
            PlaceholderStyle::for_backend(Backend::NativeMysql),
            PlaceholderStyle::Question
        );
        assert_eq!(
            PlaceholderStyle::for_backend(Backend::Postgres),
            PlaceholderStyle::Dollar
        );
        assert_eq!(
            PlaceholderStyle::for_backend(Backend::NativeMssql),
            PlaceholderStyle::AtP
        );
    }
}
