//! MySQL connector implementation

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlwrap_core::{ConnectionTarget, OperationError, WrapperError};
use sqlwrap_types::Backend;
use sqlx::mysql::{MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::types::{Decimal, Json};
use sqlx::{Column, Connection, Either, Executor, MySql, Row, Statement, ValueRef};
use tracing::debug;

use super::traits::{Connector, ResultSet};

/// Session setting applied right after connecting
const AUTOCOMMIT: &str = "SET autocommit = 1";

/// MySQL database connector holding one session
///
/// Sessions always autocommit, whatever the server default.
pub struct MySqlConnector {
    conn: MySqlConnection,
}

impl MySqlConnector {
    /// Open a session for a native MySQL target
    pub async fn connect(target: &ConnectionTarget) -> Result<Self, WrapperError> {
        let ConnectionTarget::NativeMysql {
            host,
            port,
            database,
            user,
            password,
        } = target
        else {
            return Err(WrapperError::Internal(format!(
                "mysql connector cannot open a {} target",
                target.backend()
            )));
        };

        let mut options = MySqlConnectOptions::new()
            .host(host)
            .port(*port)
            .username(user)
            .password(password.expose());
        if let Some(database) = database {
            options = options.database(database);
        }

        let fail =
            |e: sqlx::Error| WrapperError::connection(host.as_str(), Some(user.as_str()), e);
        let mut conn = MySqlConnection::connect_with(&options).await.map_err(fail)?;
        (&mut conn).execute(AUTOCOMMIT).await.map_err(fail)?;

        Ok(Self { conn })
    }

    /// Convert a MySQL row to positional JSON values
    fn row_values(row: &MySqlRow) -> Result<Vec<Value>, OperationError> {
        row.columns()
            .iter()
            .map(|column| Self::get_column_value(row, column))
            .collect()
    }

    /// Get a column value as a JSON value; unconvertible values are errors
    fn get_column_value(row: &MySqlRow, column: &MySqlColumn) -> Result<Value, OperationError> {
        use sqlx::TypeInfo;

        let idx = column.ordinal();
        if row.try_get_raw(idx).map_err(query_error)?.is_null() {
            return Ok(Value::Null);
        }

        let value = match column.type_info().name() {
            "BOOLEAN" => Value::Bool(decode(row, idx)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                Value::from(decode::<i64>(row, idx)?)
            }
            name if name.ends_with(" UNSIGNED") => Value::from(decode::<u64>(row, idx)?),
            "BIT" | "YEAR" => Value::from(decode::<u64>(row, idx)?),
            "FLOAT" => float_value(decode::<f32>(row, idx)? as f64),
            "DOUBLE" => float_value(decode(row, idx)?),
            "DECIMAL" => Value::String(decode::<Decimal>(row, idx)?.to_string()),
            "DATETIME" | "TIMESTAMP" => Value::String(
                decode::<chrono::NaiveDateTime>(row, idx)?
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string(),
            ),
            "DATE" => Value::String(decode::<chrono::NaiveDate>(row, idx)?.to_string()),
            "TIME" => Value::String(decode::<chrono::NaiveTime>(row, idx)?.to_string()),
            "JSON" => decode::<Value>(row, idx)?,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                Value::String(to_hex(&decode::<Vec<u8>>(row, idx)?))
            }
            name => Value::String(row.try_get::<String, _>(idx).map_err(|e| {
                OperationError::Execution(format!(
                    "cannot convert column \"{}\" of MySQL type {}: {}",
                    column.name(),
                    name,
                    e
                ))
            })?),
        };
        Ok(value)
    }

    /// Run text over the plain query protocol
    ///
    /// Used for statements that cannot be prepared, such as several
    /// `;`-separated statements. The last statement that produced rows
    /// supplies the result set.
    async fn execute_text(&mut self, statement: &str) -> Result<Option<ResultSet>, OperationError> {
        let mut last: Option<Vec<MySqlRow>> = None;
        let mut current: Vec<MySqlRow> = Vec::new();

        let mut results = (&mut self.conn).fetch_many(statement);
        while let Some(step) = results.try_next().await.map_err(query_error)? {
            match step {
                Either::Left(done) => {
                    debug!(rows_affected = done.rows_affected(), "statement completed");
                    if !current.is_empty() {
                        last = Some(std::mem::take(&mut current));
                    }
                }
                Either::Right(row) => current.push(row),
            }
        }
        drop(results);
        if !current.is_empty() {
            last = Some(current);
        }

        let Some(rows) = last else {
            return Ok(None);
        };
        let columns = rows[0]
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        Ok(Some(ResultSet {
            columns,
            rows: rows
                .iter()
                .map(Self::row_values)
                .collect::<Result<_, _>>()?,
        }))
    }
}

fn decode<'r, T>(row: &'r MySqlRow, idx: usize) -> Result<T, OperationError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(idx).map_err(query_error)
}

/// NaN and infinities have no JSON number form
fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(Json(other.clone())),
    }
}

fn query_error(e: sqlx::Error) -> OperationError {
    OperationError::Execution(format!("MySQL query failed: {}", e))
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError> {
        let prepared = match (&mut self.conn).prepare(statement).await {
            Ok(prepared) => prepared,
            Err(e) if params.is_empty() => {
                debug!(error = %e, "statement not preparable, using text protocol");
                return self.execute_text(statement).await;
            }
            Err(e) => return Err(query_error(e)),
        };

        let query = params
            .iter()
            .fold(prepared.query(), |query, value| bind_value(query, value));

        if prepared.columns().is_empty() {
            let done = query.execute(&mut self.conn).await.map_err(query_error)?;
            debug!(rows_affected = done.rows_affected(), "statement completed");
            return Ok(None);
        }

        let columns = prepared
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let rows = query.fetch_all(&mut self.conn).await.map_err(query_error)?;

        Ok(Some(ResultSet {
            columns,
            rows: rows
                .iter()
                .map(Self::row_values)
                .collect::<Result<_, _>>()?,
        }))
    }

    // `USE` is not allowed in the prepared-statement protocol
    async fn run_command(&mut self, statement: &str) -> Result<(), OperationError> {
        (&mut self.conn)
            .execute(statement)
            .await
            .map(|_| ())
            .map_err(query_error)
    }

    async fn close(self: Box<Self>) -> Result<(), WrapperError> {
        let this = *self;
        this.conn
            .close()
            .await
            .map_err(|e| WrapperError::Internal(format!("MySQL close failed: {}", e)))
    }

    fn backend(&self) -> Backend {
        Backend::NativeMysql
    }
}
