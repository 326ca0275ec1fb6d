//! Connector trait definition

use async_trait::async_trait;
use serde_json::Value;
use sqlwrap_core::{OperationError, WrapperError};
use sqlwrap_types::{Backend, Record, Rows};

/// One result set as returned by a driver: column names plus positional rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create an empty result set with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first column of every row
    pub fn first_column(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.first().cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Positional rows
    pub fn into_tuples(self) -> Rows {
        Rows::Tuples(self.rows)
    }

    /// Rows keyed by column name, in column order
    pub fn into_records(self) -> Rows {
        let columns = self.columns;
        let records = self
            .rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .cloned()
                    .zip(row)
                    .collect::<Record>()
            })
            .collect();
        Rows::Records(records)
    }
}

/// Result sets produced by one procedure call, consumed in order
///
/// Single-pass: once a set has been taken it cannot be revisited.
#[derive(Debug)]
pub struct ResultSets {
    sets: std::vec::IntoIter<ResultSet>,
}

impl ResultSets {
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self {
            sets: sets.into_iter(),
        }
    }
}

impl From<Vec<ResultSet>> for ResultSets {
    fn from(sets: Vec<ResultSet>) -> Self {
        Self::new(sets)
    }
}

impl Iterator for ResultSets {
    type Item = ResultSet;

    fn next(&mut self) -> Option<Self::Item> {
        self.sets.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sets.size_hint()
    }
}

/// Trait for database connectors
///
/// A connector owns exactly one live session. All implementations speak
/// autocommit: every statement is committed when it completes.
#[async_trait]
pub trait Connector: Send {
    /// Execute one statement with positional parameters
    ///
    /// Returns `None` when the statement produced no result-set description
    /// (DML, DDL, `USE`), and the first result set otherwise.
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError>;

    /// Run a session command such as `USE <db>` outside any prepared statement
    async fn run_command(&mut self, statement: &str) -> Result<(), OperationError> {
        self.execute(statement, &[]).await.map(|_| ())
    }

    /// Call a stored procedure and collect every result set it produces
    async fn call_procedure(
        &mut self,
        procedure: &str,
        params: &[Value],
    ) -> Result<ResultSets, OperationError> {
        let _ = (procedure, params);
        Err(OperationError::ProcedureUnsupported(self.backend()))
    }

    /// Close the session and release resources
    async fn close(self: Box<Self>) -> Result<(), WrapperError>;

    /// Backend this connector speaks
    fn backend(&self) -> Backend;
}
