//! Native SQL Server connector over TDS

use async_trait::async_trait;
use serde_json::Value;
use sqlwrap_core::{ConnectionSettings, ConnectionTarget, OperationError, WrapperError};
use sqlwrap_types::Backend;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, QueryStream, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::traits::{Connector, ResultSet, ResultSets};

/// SQL Server connector holding one TDS session
///
/// TDS sessions autocommit unless a transaction is opened explicitly.
pub struct MssqlConnector {
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnector {
    /// Open a session for a native MSSQL target
    pub async fn connect(
        target: &ConnectionTarget,
        settings: &ConnectionSettings,
    ) -> Result<Self, WrapperError> {
        let ConnectionTarget::NativeMssql {
            host,
            port,
            database,
            user,
            password,
        } = target
        else {
            return Err(WrapperError::Internal(format!(
                "mssql connector cannot open a {} target",
                target.backend()
            )));
        };
        let fail = |e: &dyn std::fmt::Display| {
            WrapperError::connection(host.as_str(), Some(user.as_str()), e)
        };

        let mut config = Config::new();
        config.host(host);
        config.port(*port);
        if let Some(database) = database {
            config.database(database);
        }
        config.authentication(auth_method(user, password.expose()).map_err(|e| fail(&e))?);
        if settings.trust_server_certificate() {
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| fail(&e))?;
        tcp.set_nodelay(true).map_err(|e| fail(&e))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| fail(&e))?;

        Ok(Self { client })
    }

    /// Send a statement: a plain batch without parameters, `sp_executesql` with them
    ///
    /// Session state such as `USE` only survives a plain batch.
    async fn send<'a>(
        &'a mut self,
        statement: &'a str,
        params: &'a [&'a dyn ToSql],
    ) -> tiberius::Result<QueryStream<'a>> {
        if params.is_empty() {
            self.client.simple_query(statement).await
        } else {
            self.client.query(statement, params).await
        }
    }
}

/// Domain-qualified users (`DOMAIN\user`) authenticate through Windows/NTLM
fn uses_windows_auth(user: &str) -> bool {
    user.contains('\\')
}

/// NTLM is only built into Windows binaries; elsewhere domain users go through ODBC
fn auth_method(user: &str, password: &str) -> Result<AuthMethod, String> {
    if !uses_windows_auth(user) {
        return Ok(AuthMethod::sql_server(user, password));
    }
    #[cfg(windows)]
    {
        Ok(AuthMethod::windows(user, password))
    }
    #[cfg(not(windows))]
    {
        Err(format!(
            "Windows authentication for {} needs a Windows build; use the odbc method instead",
            user
        ))
    }
}

fn to_sql_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn row_values(row: Row) -> Vec<Value> {
    row.into_iter().map(|data| column_value(&data)).collect()
}

/// Convert one TDS value to JSON
fn column_value(data: &ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(|f| float_value(f as f64)).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(float_value).unwrap_or(Value::Null),
        ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(v) => v
            .as_ref()
            .map(|g| Value::String(g.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| Value::String(format_scaled(n.value(), n.scale())))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|bytes| Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            chrono::NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                .unwrap_or(Value::Null)
        }
        ColumnData::Date(_) => chrono::NaiveDate::from_sql(data)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Time(_) => chrono::NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTimeOffset(_) => chrono::DateTime::<chrono::Utc>::from_sql(data)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|xml| Value::String(xml.to_string()))
            .unwrap_or(Value::Null),
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{:?}", other)),
    }
}

/// NaN and infinities have no JSON number form
fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

/// Render an unscaled integer with `scale` decimal places
fn format_scaled(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let digits = value.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_part, frac_part)
}

fn query_error(e: tiberius::error::Error) -> OperationError {
    OperationError::Execution(format!("SQL Server query failed: {}", e))
}

fn to_result_set(rows: Vec<Row>) -> ResultSet {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        })
        .unwrap_or_default();
    ResultSet {
        columns,
        rows: rows.into_iter().map(row_values).collect(),
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError> {
        let owned: Vec<Box<dyn ToSql>> = params.iter().map(to_sql_param).collect();
        let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();

        let mut stream = self.send(statement, &refs).await.map_err(query_error)?;
        let columns: Option<Vec<String>> = stream
            .columns()
            .await
            .map_err(query_error)?
            .map(|columns| columns.iter().map(|c| c.name().to_string()).collect());

        let rows = stream.into_first_result().await.map_err(query_error)?;

        match columns {
            Some(columns) => Ok(Some(ResultSet {
                columns,
                rows: rows.into_iter().map(row_values).collect(),
            })),
            None => Ok(None),
        }
    }

    async fn run_command(&mut self, statement: &str) -> Result<(), OperationError> {
        self.client
            .simple_query(statement)
            .await
            .map_err(query_error)?
            .into_results()
            .await
            .map(|_| ())
            .map_err(query_error)
    }

    async fn call_procedure(
        &mut self,
        procedure: &str,
        params: &[Value],
    ) -> Result<ResultSets, OperationError> {
        let placeholders: Vec<String> = (1..=params.len()).map(|n| format!("@P{}", n)).collect();
        let statement = if placeholders.is_empty() {
            format!("EXEC {}", procedure)
        } else {
            format!("EXEC {} {}", procedure, placeholders.join(", "))
        };
        debug!(statement = %statement, "calling procedure");

        let owned: Vec<Box<dyn ToSql>> = params.iter().map(to_sql_param).collect();
        let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();

        let sets = self
            .send(&statement, &refs)
            .await
            .map_err(query_error)?
            .into_results()
            .await
            .map_err(query_error)?;

        Ok(sets.into_iter().map(to_result_set).collect::<Vec<_>>().into())
    }

    async fn close(self: Box<Self>) -> Result<(), WrapperError> {
        let this = *self;
        this.client
            .close()
            .await
            .map_err(|e| WrapperError::Internal(format!("SQL Server close failed: {}", e)))
    }

    fn backend(&self) -> Backend {
        Backend::NativeMssql
    }
}
