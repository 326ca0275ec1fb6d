//! ODBC connector for the `odbc` and `dsn` backends

use async_trait::async_trait;
use odbc_api::parameter::VarCharBox;
use odbc_api::{Connection, ConnectionOptions, Cursor, DataType, Environment, ResultSetMetadata};
use serde_json::Value;
use sqlwrap_core::{ConnectionTarget, OperationError, WrapperError};
use sqlwrap_types::Backend;
use std::sync::OnceLock;
use tracing::warn;

use super::traits::{Connector, ResultSet};

static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment, odbc_api::Error> {
    if let Some(env) = ODBC_ENV.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ODBC_ENV.get_or_init(|| env))
}

/// ODBC database connector holding one connection
pub struct OdbcConnector {
    connection: Connection<'static>,
    backend: Backend,
}

impl OdbcConnector {
    /// Connect with the first connection string that succeeds
    ///
    /// `attempts` holds the primary driver's string followed by any fallback.
    pub fn connect(target: &ConnectionTarget, attempts: &[String]) -> Result<Self, WrapperError> {
        let fail = |e: &dyn std::fmt::Display| {
            WrapperError::connection(target.host(), target.user(), e)
        };
        let env = environment().map_err(|e| fail(&e))?;

        let mut last_error = None;
        for (index, connection_string) in attempts.iter().enumerate() {
            match env.connect_with_connection_string(connection_string, ConnectionOptions::default())
            {
                Ok(connection) => {
                    connection.set_autocommit(true).map_err(|e| fail(&e))?;
                    return Ok(Self {
                        connection,
                        backend: target.backend(),
                    });
                }
                Err(e) => {
                    if index + 1 < attempts.len() {
                        warn!(host = target.host(), error = %e, "ODBC connect failed, trying fallback driver");
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => fail(&e),
            None => fail(&"no ODBC connection string"),
        })
    }

    fn read_result_set(cursor: &mut impl Cursor) -> Result<ResultSet, odbc_api::Error> {
        let count = cursor.num_result_cols()?.max(0) as u16;
        let mut columns = Vec::with_capacity(count as usize);
        let mut types = Vec::with_capacity(count as usize);
        for column in 1..=count {
            columns.push(cursor.col_name(column)?);
            types.push(cursor.col_data_type(column)?);
        }

        let mut rows = Vec::new();
        let mut buf = Vec::new();
        while let Some(mut row) = cursor.next_row()? {
            let mut values = Vec::with_capacity(types.len());
            for (index, data_type) in types.iter().enumerate() {
                buf.clear();
                let present = row.get_text(index as u16 + 1, &mut buf)?;
                values.push(if present {
                    text_value(&buf, data_type)
                } else {
                    Value::Null
                });
            }
            rows.push(values);
        }

        Ok(ResultSet { columns, rows })
    }
}

/// Interpret a column's text representation according to its SQL type
fn text_value(bytes: &[u8], data_type: &DataType) -> Value {
    let text = String::from_utf8_lossy(bytes);
    let parsed = match data_type {
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
            text.trim().parse::<i64>().ok().map(Value::from)
        }
        DataType::Real | DataType::Float { .. } | DataType::Double => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        DataType::Bit => match text.trim() {
            "1" => Some(Value::Bool(true)),
            "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.into_owned()))
}

fn text_parameter(value: &Value) -> VarCharBox {
    match value {
        Value::Null => VarCharBox::null(),
        Value::Bool(b) => VarCharBox::from_string(if *b { "1" } else { "0" }.to_string()),
        Value::String(s) => VarCharBox::from_string(s.clone()),
        other => VarCharBox::from_string(other.to_string()),
    }
}

fn query_error(e: odbc_api::Error) -> OperationError {
    OperationError::Execution(format!("ODBC query failed: {}", e))
}

#[async_trait]
impl Connector for OdbcConnector {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError> {
        let params: Vec<VarCharBox> = params.iter().map(text_parameter).collect();
        match self
            .connection
            .execute(statement, params.as_slice())
            .map_err(query_error)?
        {
            Some(mut cursor) => Self::read_result_set(&mut cursor)
                .map(Some)
                .map_err(query_error),
            None => Ok(None),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), WrapperError> {
        drop(self);
        Ok(())
    }

    fn backend(&self) -> Backend {
        self.backend
    }
}
