//! PostgreSQL connector implementation

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlwrap_core::{ConnectionTarget, OperationError, WrapperError};
use sqlwrap_types::Backend;
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{
    PgArguments, PgColumn, PgConnectOptions, PgConnection, PgRow, PgTypeInfo, PgTypeKind,
    PgValueFormat,
};
use sqlx::query::Query;
use sqlx::types::{Decimal, Json};
use sqlx::{Column, Connection, Either, Executor, Postgres, Row, Statement, Type, ValueRef};
use tracing::debug;

use super::traits::{Connector, ResultSet};

/// PostgreSQL database connector holding one session
pub struct PostgresConnector {
    conn: PgConnection,
}

impl PostgresConnector {
    /// Open a session for a Postgres target
    pub async fn connect(target: &ConnectionTarget) -> Result<Self, WrapperError> {
        let ConnectionTarget::Postgres {
            host,
            port,
            database,
            user,
            password,
        } = target
        else {
            return Err(WrapperError::Internal(format!(
                "postgres connector cannot open a {} target",
                target.backend()
            )));
        };

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(*port)
            .database(database);
        if let Some(user) = user {
            options = options.username(user);
        }
        if let Some(password) = password {
            options = options.password(password.expose());
        }

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| WrapperError::connection(host.as_str(), user.as_deref(), e))?;

        Ok(Self { conn })
    }

    /// Declared parameter types, kept in step with [`bind_value`]
    fn param_types(params: &[Value]) -> Vec<PgTypeInfo> {
        params
            .iter()
            .map(|value| match value {
                Value::Null => PgTypeInfo::with_oid(Oid(0)),
                Value::Bool(_) => <bool as Type<Postgres>>::type_info(),
                Value::Number(n) if n.as_i64().is_some() => <i64 as Type<Postgres>>::type_info(),
                Value::Number(_) => <f64 as Type<Postgres>>::type_info(),
                Value::String(_) => <String as Type<Postgres>>::type_info(),
                Value::Array(_) | Value::Object(_) => <Json<Value> as Type<Postgres>>::type_info(),
            })
            .collect()
    }

    /// Convert a PostgreSQL row to positional JSON values
    fn row_values(row: &PgRow) -> Result<Vec<Value>, OperationError> {
        row.columns()
            .iter()
            .map(|column| Self::get_column_value(row, column))
            .collect()
    }

    /// Get a column value as a JSON value
    ///
    /// A non-null value that cannot be converted is an error, never `null`.
    fn get_column_value(row: &PgRow, column: &PgColumn) -> Result<Value, OperationError> {
        use sqlx::TypeInfo;

        let idx = column.ordinal();
        let raw = row.try_get_raw(idx).map_err(query_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_info = column.type_info();
        // Simple-query rows are all text; enum labels are text in either format
        let textual = raw.format() == PgValueFormat::Text
            || matches!(type_info.kind(), PgTypeKind::Enum(_));

        let value = match type_info.name() {
            "BOOL" => Value::Bool(decode(row, idx)?),
            "INT2" => Value::from(decode::<i16>(row, idx)?),
            "INT4" => Value::from(decode::<i32>(row, idx)?),
            "INT8" => Value::from(decode::<i64>(row, idx)?),
            "FLOAT4" => float_value(decode::<f32>(row, idx)? as f64),
            "FLOAT8" => float_value(decode(row, idx)?),
            "NUMERIC" => Value::String(decode::<Decimal>(row, idx)?.to_string()),
            "UUID" => Value::String(decode::<uuid::Uuid>(row, idx)?.to_string()),
            "TIMESTAMPTZ" => Value::String(
                decode::<chrono::DateTime<chrono::Utc>>(row, idx)?.to_rfc3339(),
            ),
            "TIMESTAMP" => Value::String(
                decode::<chrono::NaiveDateTime>(row, idx)?
                    .format("%Y-%m-%dT%H:%M:%S%.f")
                    .to_string(),
            ),
            "DATE" => Value::String(decode::<chrono::NaiveDate>(row, idx)?.to_string()),
            "TIME" => Value::String(decode::<chrono::NaiveTime>(row, idx)?.to_string()),
            "JSON" | "JSONB" => decode::<Value>(row, idx)?,
            _ if textual => Value::String(
                raw.as_str()
                    .map_err(|e| conversion_error(column, e))?
                    .to_string(),
            ),
            "BYTEA" => Value::String(to_hex(&decode::<Vec<u8>>(row, idx)?)),
            "INTERVAL" => {
                let interval: PgInterval = decode(row, idx)?;
                Value::String(format_interval(
                    interval.months,
                    interval.days,
                    interval.microseconds,
                ))
            }
            "BOOL[]" => array(decode(row, idx)?, Value::Bool),
            "INT2[]" => array(decode::<Vec<Option<i16>>>(row, idx)?, Value::from),
            "INT4[]" => array(decode::<Vec<Option<i32>>>(row, idx)?, Value::from),
            "INT8[]" => array(decode::<Vec<Option<i64>>>(row, idx)?, Value::from),
            "FLOAT4[]" => array(decode::<Vec<Option<f32>>>(row, idx)?, |f| {
                float_value(f as f64)
            }),
            "FLOAT8[]" => array(decode(row, idx)?, float_value),
            "NUMERIC[]" => array(decode::<Vec<Option<Decimal>>>(row, idx)?, |d| {
                Value::String(d.to_string())
            }),
            "UUID[]" => array(decode::<Vec<Option<uuid::Uuid>>>(row, idx)?, |u| {
                Value::String(u.to_string())
            }),
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
                array(decode(row, idx)?, Value::String)
            }
            _ => Value::String(
                row.try_get::<String, _>(idx)
                    .map_err(|e| conversion_error(column, e))?,
            ),
        };
        Ok(value)
    }

    /// Run text over the simple query protocol
    ///
    /// Used for statements that cannot be prepared, such as several
    /// `;`-separated statements. The last statement that produced rows
    /// supplies the result set.
    async fn execute_text(&mut self, statement: &str) -> Result<Option<ResultSet>, OperationError> {
        let mut last: Option<Vec<PgRow>> = None;
        let mut current: Vec<PgRow> = Vec::new();

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

fn decode<'r, T>(row: &'r PgRow, idx: usize) -> Result<T, OperationError>
where
    T: sqlx::Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(idx).map_err(query_error)
}

fn conversion_error(column: &PgColumn, e: impl std::fmt::Display) -> OperationError {
    use sqlx::TypeInfo;

    OperationError::Execution(format!(
        "cannot convert column \"{}\" of PostgreSQL type {}: {}",
        column.name(),
        column.type_info().name(),
        e
    ))
}

/// NaN and infinities have no JSON number form
fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

fn array<T>(items: Vec<Option<T>>, convert: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map(&convert).unwrap_or(Value::Null))
            .collect(),
    )
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Render an interval the way `psql` does: `1 year 2 mons 3 days 04:05:06`
fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    let mut parts = Vec::new();
    for (n, unit) in [
        (months / 12, "year"),
        (months % 12, "mon"),
        (days, "day"),
    ] {
        if n != 0 {
            let plural = if n.abs() == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", n, unit, plural));
        }
    }

    if microseconds != 0 || parts.is_empty() {
        let sign = if microseconds < 0 { "-" } else { "" };
        let total = microseconds.unsigned_abs();
        let (secs, frac) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if frac != 0 {
            let digits = format!("{:06}", frac);
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
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
    OperationError::Execution(format!("PostgreSQL query failed: {}", e))
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError> {
        let types = Self::param_types(params);
        let prepared = match (&mut self.conn).prepare_with(statement, &types).await {
            Ok(prepared) => prepared,
            Err(e) if params.is_empty() => {
                debug!(error = %e, "statement not preparable, using simple query protocol");
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
            .map_err(|e| WrapperError::Internal(format!("PostgreSQL close failed: {}", e)))
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }
}
