//! Request and result types shared by the wrapper and its callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row in dictionary mode: column name to value, in query column order
pub type Record = serde_json::Map<String, Value>;

/// The `query` field of a request
///
/// Anything that is neither a string nor a list of strings deserializes into
/// `Malformed` so the wrapper can reject it as a caller error instead of the
/// whole request failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryText {
    /// One statement
    Single(String),
    /// Statements executed in order
    Batch(Vec<String>),
    /// Unsupported shape
    Malformed(Value),
}

impl Default for QueryText {
    fn default() -> Self {
        QueryText::Malformed(Value::Null)
    }
}

/// Bound parameters for a single statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Bound in order to the backend's positional placeholders
    Positional(Vec<Value>),
    /// Bound to `:name` tokens in the statement
    Named(serde_json::Map<String, Value>),
}

/// Query execution request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Statement or statements to execute
    #[serde(default)]
    pub query: QueryText,

    /// Whether rows should be returned (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<bool>,

    /// Return rows as records keyed by column name
    #[serde(default)]
    pub dict: bool,

    /// Database to switch to before executing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Bound parameters (single statements only)
    #[serde(default, alias = "params", skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Params>,
}

impl QueryRequest {
    /// A single statement whose rows are requested
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            query: QueryText::Single(statement.into()),
            results: Some(true),
            ..Self::default()
        }
    }

    /// A batch of statements whose first columns are requested
    pub fn batch<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: QueryText::Batch(statements.into_iter().map(Into::into).collect()),
            results: Some(true),
            ..Self::default()
        }
    }

    /// Set whether rows should be returned
    pub fn with_results(mut self, results: bool) -> Self {
        self.results = Some(results);
        self
    }

    /// Request dictionary-shaped rows
    pub fn with_dict(mut self) -> Self {
        self.dict = true;
        self
    }

    /// Switch to `db` before executing
    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Bind parameters to the statement
    pub fn with_params(mut self, params: Params) -> Self {
        self.parameters = Some(params);
        self
    }
}

/// Stored procedure request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcRequest {
    /// Procedure name, optionally schema-qualified
    pub proc: String,

    /// Positional parameters
    #[serde(default)]
    pub params: Vec<Value>,

    /// Return rows as records keyed by column name
    #[serde(default)]
    pub dict: bool,
}

impl ProcRequest {
    /// Create a request for `proc` with no parameters
    pub fn new(proc: impl Into<String>) -> Self {
        Self {
            proc: proc.into(),
            params: Vec::new(),
            dict: false,
        }
    }

    /// Append a positional parameter
    pub fn with_param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Request dictionary-shaped rows
    pub fn with_dict(mut self) -> Self {
        self.dict = true;
        self
    }
}

/// Rows of one result set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    /// Positional rows
    Tuples(Vec<Vec<Value>>),
    /// Dictionary rows
    Records(Vec<Record>),
}

impl Rows {
    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Rows::Tuples(rows) => rows.len(),
            Rows::Records(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first column of every row
    pub fn first_column(&self) -> Vec<Value> {
        match self {
            Rows::Tuples(rows) => rows
                .iter()
                .map(|row| row.first().cloned().unwrap_or(Value::Null))
                .collect(),
            Rows::Records(rows) => rows
                .iter()
                .map(|row| row.values().next().cloned().unwrap_or(Value::Null))
                .collect(),
        }
    }
}

/// Successful outcome of a query or procedure call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueryOutput {
    /// Statement ran; no rows were requested or none were described
    Ack,
    /// Rows of a single result set
    Rows(Rows),
    /// First-column values per statement of a batch
    Columns(Vec<Vec<Value>>),
    /// Several non-empty result sets from one procedure call
    ResultSets(Vec<Rows>),
}

impl QueryOutput {
    /// Returns the rows if this output carries exactly one result set
    pub fn rows(&self) -> Option<&Rows> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, QueryOutput::Ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_shapes() {
        let request: QueryRequest =
            serde_json::from_value(json!({"query": "select 1", "results": true})).unwrap();
        assert_eq!(request.query, QueryText::Single("select 1".to_string()));
        assert_eq!(request.results, Some(true));
        assert!(!request.dict);

        let request: QueryRequest =
            serde_json::from_value(json!({"query": ["a", "b"], "results": false})).unwrap();
        assert_eq!(
            request.query,
            QueryText::Batch(vec!["a".to_string(), "b".to_string()])
        );

        let request: QueryRequest = serde_json::from_value(json!({"query": 42})).unwrap();
        assert_eq!(request.query, QueryText::Malformed(json!(42)));
        assert_eq!(request.results, None);
    }

    #[test]
    fn test_query_request_params() {
        let request: QueryRequest = serde_json::from_value(json!({
            "query": "select ?",
            "results": true,
            "params": [1, "x"]
        }))
        .unwrap();
        assert_eq!(
            request.parameters,
            Some(Params::Positional(vec![json!(1), json!("x")]))
        );

        let request: QueryRequest = serde_json::from_value(json!({
            "query": "select :id",
            "results": true,
            "parameters": {"id": 7}
        }))
        .unwrap();
        assert!(matches!(request.parameters, Some(Params::Named(_))));
    }

    #[test]
    fn test_rows_first_column() {
        let rows = Rows::Tuples(vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]]);
        assert_eq!(rows.first_column(), vec![json!(1), json!(2)]);

        let mut record = Record::new();
        record.insert("z".to_string(), json!("first"));
        record.insert("a".to_string(), json!("second"));
        let rows = Rows::Records(vec![record]);
        assert_eq!(rows.first_column(), vec![json!("first")]);
    }

    #[test]
    fn test_output_serialization() {
        let output = QueryOutput::Rows(Rows::Tuples(vec![vec![json!(1)]]));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"kind": "rows", "data": [[1]]})
        );
        assert_eq!(
            serde_json::to_value(QueryOutput::Ack).unwrap(),
            json!({"kind": "ack"})
        );
    }
}
