//! Query execution module
//!
//! Turns caller requests into driver calls and shapes what comes back:
//! database switching, batch and single statements, parameter binding,
//! row mode, and procedure result-set collapsing.

mod params;
mod validator;

pub use params::{bind, bind_named, named_tokens, BoundStatement, PlaceholderStyle};
pub use validator::RequestValidator;

use sqlwrap_core::OperationError;
use sqlwrap_types::{Backend, ProcRequest, QueryOutput, QueryRequest, QueryText, Rows};
use tracing::{debug, warn};

use crate::connectors::{Connector, ResultSet, ResultSets};

/// Executes requests against one connector
pub struct RequestExecutor {
    backend: Backend,
    debug: bool,
    validator: RequestValidator,
}

impl RequestExecutor {
    /// Create an executor for `backend`; `debug` raises failure reports to warn
    pub fn new(backend: Backend, debug: bool) -> Self {
        Self {
            backend,
            debug,
            validator: RequestValidator::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Run a query request
    pub async fn query(
        &self,
        connector: &mut dyn Connector,
        request: &QueryRequest,
    ) -> Result<QueryOutput, OperationError> {
        let result = self.run_query(connector, request).await;
        if let Err(err) = &result {
            self.report("query", err);
        }
        result
    }

    /// Run a stored-procedure request
    pub async fn proc(
        &self,
        connector: &mut dyn Connector,
        request: &ProcRequest,
    ) -> Result<QueryOutput, OperationError> {
        let result = self.run_proc(connector, request).await;
        if let Err(err) = &result {
            self.report("proc", err);
        }
        result
    }

    async fn run_query(
        &self,
        connector: &mut dyn Connector,
        request: &QueryRequest,
    ) -> Result<QueryOutput, OperationError> {
        if let Some(database) = &request.db {
            self.switch_database(connector, database).await?;
        }

        let results = self.validator.results_flag(request)?;

        match &request.query {
            QueryText::Batch(statements) => self.run_batch(connector, statements, results).await,
            QueryText::Single(statement) => {
                self.run_single(connector, statement, request, results)
                    .await
            }
            QueryText::Malformed(_) => Err(OperationError::MalformedQuery),
        }
    }

    async fn switch_database(
        &self,
        connector: &mut dyn Connector,
        database: &str,
    ) -> Result<(), OperationError> {
        let statement = self.validator.use_statement(self.backend, database)?;
        debug!(database, "switching database");

        connector
            .run_command(&statement)
            .await
            .map_err(|err| OperationError::DatabaseSwitch {
                database: database.to_string(),
                message: driver_message(err),
            })
    }

    async fn run_batch(
        &self,
        connector: &mut dyn Connector,
        statements: &[String],
        results: bool,
    ) -> Result<QueryOutput, OperationError> {
        let mut columns = Vec::with_capacity(statements.len());

        for (index, statement) in statements.iter().enumerate() {
            debug!(index, statement = %statement, "executing batch statement");
            let set = connector.execute(statement, &[]).await?;
            columns.push(set.map(|set| set.first_column()).unwrap_or_default());
        }

        if results {
            Ok(QueryOutput::Columns(columns))
        } else {
            Ok(QueryOutput::Ack)
        }
    }

    async fn run_single(
        &self,
        connector: &mut dyn Connector,
        statement: &str,
        request: &QueryRequest,
        results: bool,
    ) -> Result<QueryOutput, OperationError> {
        let bound = bind(
            statement,
            request.parameters.as_ref(),
            PlaceholderStyle::for_backend(self.backend),
        )?;
        debug!(statement = %bound.sql, params = bound.params.len(), "executing statement");

        match connector.execute(&bound.sql, &bound.params).await? {
            Some(set) if results => Ok(QueryOutput::Rows(self.shape(set, request.dict))),
            _ => Ok(QueryOutput::Ack),
        }
    }

    async fn run_proc(
        &self,
        connector: &mut dyn Connector,
        request: &ProcRequest,
    ) -> Result<QueryOutput, OperationError> {
        let name = self.validator.procedure(request)?;
        debug!(procedure = name, params = request.params.len(), "calling procedure");

        match self.backend {
            Backend::Odbc | Backend::Dsn => {
                let call = odbc_call(name, request.params.len());
                match connector.execute(&call, &request.params).await? {
                    Some(set) => Ok(QueryOutput::Rows(self.shape(set, request.dict))),
                    None => Ok(QueryOutput::Ack),
                }
            }
            Backend::NativeMssql => {
                let sets = connector.call_procedure(name, &request.params).await?;
                Ok(self.collapse(sets, request.dict))
            }
            backend => Err(OperationError::ProcedureUnsupported(backend)),
        }
    }

    /// Records when the backend produces them natively or on request
    fn shape(&self, set: ResultSet, dict: bool) -> Rows {
        let records =
            self.backend.native_records() || (dict && self.backend.supports_records());
        if records {
            set.into_records()
        } else {
            set.into_tuples()
        }
    }

    /// Skip empty sets; one set is returned directly, several as a list
    fn collapse(&self, sets: ResultSets, dict: bool) -> QueryOutput {
        let mut shaped: Vec<Rows> = sets
            .filter(|set| !set.is_empty())
            .map(|set| self.shape(set, dict))
            .collect();

        match shaped.len() {
            0 => QueryOutput::Ack,
            1 => QueryOutput::Rows(shaped.remove(0)),
            _ => QueryOutput::ResultSets(shaped),
        }
    }

    fn report(&self, operation: &str, err: &OperationError) {
        if self.debug {
            warn!(backend = %self.backend, operation, error = %err, "operation failed");
        } else {
            debug!(backend = %self.backend, operation, error = %err, "operation failed");
        }
    }
}

/// ODBC escape syntax for a procedure call with `count` bound parameters
pub fn odbc_call(name: &str, count: usize) -> String {
    if count == 0 {
        format!("{{CALL {}}}", name)
    } else {
        format!("{{CALL {} ({})}}", name, vec!["?"; count].join(", "))
    }
}

fn driver_message(err: OperationError) -> String {
    match err {
        OperationError::Execution(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedConnector};
    use serde_json::{json, Value};
    use sqlwrap_types::Params;

    fn one_column(column: &str, values: &[Value]) -> ResultSet {
        values
            .iter()
            .fold(ResultSet::new([column]), |set, v| set.with_row(vec![v.clone()]))
    }

    fn report_rows() -> ResultSet {
        ResultSet::new(["end_time", "extract"])
            .with_row(vec![json!("2024-01-02T06:00:00"), json!("EXT001")])
            .with_row(vec![json!("2024-01-02T06:30:00"), json!("EXT002")])
    }

    #[tokio::test]
    async fn test_missing_results_flag_every_backend() {
        for backend in Backend::all() {
            let mut connector = ScriptedConnector::new(*backend);
            let handle = connector.handle();
            let mut request = QueryRequest::new("select 1");
            request.results = None;

            let result = RequestExecutor::new(*backend, false)
                .query(&mut connector, &request)
                .await;
            assert_eq!(result, Err(OperationError::MissingResultsFlag));
            assert!(handle.statements().is_empty());
        }
    }

    #[tokio::test]
    async fn test_batch_first_columns() {
        let mut connector = ScriptedConnector::new(Backend::Odbc)
            .rows("A", one_column("id", &[json!(1), json!(2)]))
            .rows("B", one_column("name", &[json!("x")]))
            .reply("C", Reply::NoDescription);
        let executor = RequestExecutor::new(Backend::Odbc, false);

        let output = executor
            .query(&mut connector, &QueryRequest::batch(["A", "B", "C"]))
            .await
            .unwrap();
        assert_eq!(
            output,
            QueryOutput::Columns(vec![vec![json!(1), json!(2)], vec![json!("x")], vec![]])
        );

        let output = executor
            .query(
                &mut connector,
                &QueryRequest::batch(["A", "B"]).with_results(false),
            )
            .await
            .unwrap();
        assert_eq!(output, QueryOutput::Ack);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_failure() {
        let mut connector = ScriptedConnector::new(Backend::NativeMysql)
            .rows("A", one_column("id", &[json!(1)]))
            .reply("B", Reply::Fail("syntax error".to_string()))
            .rows("C", one_column("id", &[json!(3)]));
        let handle = connector.handle();

        let result = RequestExecutor::new(Backend::NativeMysql, false)
            .query(&mut connector, &QueryRequest::batch(["A", "B", "C"]))
            .await;
        assert_eq!(
            result,
            Err(OperationError::Execution("syntax error".to_string()))
        );
        assert_eq!(handle.statements(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_dml_without_results_is_ack_every_backend() {
        let dml = "UPDATE report_request SET end_time = NULL";
        for backend in Backend::all() {
            let mut connector =
                ScriptedConnector::new(*backend).reply(dml, Reply::NoDescription);
            let output = RequestExecutor::new(*backend, false)
                .query(&mut connector, &QueryRequest::new(dml).with_results(false))
                .await;
            assert_eq!(output, Ok(QueryOutput::Ack));

            // no description means ack even when rows were asked for
            let output = RequestExecutor::new(*backend, false)
                .query(&mut connector, &QueryRequest::new(dml))
                .await;
            assert_eq!(output, Ok(QueryOutput::Ack));
        }
    }

    #[tokio::test]
    async fn test_results_false_skips_rows() {
        let mut connector = ScriptedConnector::new(Backend::Postgres)
            .rows("select 1", one_column("?column?", &[json!(1)]));
        let output = RequestExecutor::new(Backend::Postgres, false)
            .query(&mut connector, &QueryRequest::new("select 1").with_results(false))
            .await;
        assert_eq!(output, Ok(QueryOutput::Ack));
    }

    #[tokio::test]
    async fn test_row_modes() {
        let sql = "SELECT end_time, extract FROM report_request";

        let mut odbc = ScriptedConnector::new(Backend::Odbc).rows(sql, report_rows());
        let executor = RequestExecutor::new(Backend::Odbc, false);
        let tuples = executor.query(&mut odbc, &QueryRequest::new(sql)).await.unwrap();
        assert!(matches!(tuples.rows(), Some(Rows::Tuples(rows)) if rows.len() == 2));

        let records = executor
            .query(&mut odbc, &QueryRequest::new(sql).with_dict())
            .await
            .unwrap();
        match records.rows() {
            Some(Rows::Records(rows)) => {
                for row in rows {
                    let keys: Vec<&String> = row.keys().collect();
                    assert_eq!(keys, vec!["end_time", "extract"]);
                }
                assert_eq!(rows[0]["extract"], json!("EXT001"));
            }
            other => panic!("expected records, got {other:?}"),
        }

        let mut mssql = ScriptedConnector::new(Backend::NativeMssql).rows(sql, report_rows());
        let native = RequestExecutor::new(Backend::NativeMssql, false)
            .query(&mut mssql, &QueryRequest::new(sql))
            .await
            .unwrap();
        assert!(matches!(native.rows(), Some(Rows::Records(_))));

        let mut pg = ScriptedConnector::new(Backend::Postgres).rows(sql, report_rows());
        let positional = RequestExecutor::new(Backend::Postgres, false)
            .query(&mut pg, &QueryRequest::new(sql).with_dict())
            .await
            .unwrap();
        assert!(matches!(positional.rows(), Some(Rows::Tuples(_))));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_failure() {
        let sql = "SELECT * FROM report_request WHERE 1 = 0";
        let mut connector = ScriptedConnector::new(Backend::Dsn).rows(sql, ResultSet::new(["id"]));
        let output = RequestExecutor::new(Backend::Dsn, false)
            .query(&mut connector, &QueryRequest::new(sql))
            .await;
        assert_eq!(output, Ok(QueryOutput::Rows(Rows::Tuples(vec![]))));
    }

    #[tokio::test]
    async fn test_database_switch() {
        let mut connector = ScriptedConnector::new(Backend::NativeMssql)
            .rows("select 1", one_column("", &[json!(1)]));
        let handle = connector.handle();

        RequestExecutor::new(Backend::NativeMssql, false)
            .query(&mut connector, &QueryRequest::new("select 1").with_db("worldwide"))
            .await
            .unwrap();
        assert_eq!(handle.statements(), vec!["USE [worldwide]", "select 1"]);
    }

    #[tokio::test]
    async fn test_database_switch_failure() {
        let mut connector = ScriptedConnector::new(Backend::NativeMysql)
            .reply("USE `nope`", Reply::Fail("Unknown database 'nope'".to_string()));
        let result = RequestExecutor::new(Backend::NativeMysql, true)
            .query(&mut connector, &QueryRequest::new("select 1").with_db("nope"))
            .await;
        assert_eq!(
            result,
            Err(OperationError::DatabaseSwitch {
                database: "nope".to_string(),
                message: "Unknown database 'nope'".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_database_switch_postgres_always_fails() {
        for db in ["batch", "postgres", "x"] {
            let mut connector = ScriptedConnector::new(Backend::Postgres);
            let handle = connector.handle();
            let result = RequestExecutor::new(Backend::Postgres, false)
                .query(&mut connector, &QueryRequest::new("select 1").with_db(db))
                .await;
            assert_eq!(
                result,
                Err(OperationError::DatabaseSwitchUnsupported(Backend::Postgres))
            );
            assert!(handle.statements().is_empty());
        }
    }

    #[tokio::test]
    async fn test_switch_runs_before_results_check() {
        let mut connector = ScriptedConnector::new(Backend::Odbc);
        let handle = connector.handle();
        let mut request = QueryRequest::new("select 1").with_db("worldwide");
        request.results = None;

        let result = RequestExecutor::new(Backend::Odbc, false)
            .query(&mut connector, &request)
            .await;
        assert_eq!(result, Err(OperationError::MissingResultsFlag));
        assert_eq!(handle.statements(), vec!["USE [worldwide]"]);
    }

    #[tokio::test]
    async fn test_malformed_query() {
        let request: QueryRequest =
            serde_json::from_value(json!({"query": 42, "results": true})).unwrap();
        let mut connector = ScriptedConnector::new(Backend::Odbc);
        let result = RequestExecutor::new(Backend::Odbc, false)
            .query(&mut connector, &request)
            .await;
        assert_eq!(result, Err(OperationError::MalformedQuery));
    }

    #[tokio::test]
    async fn test_named_parameters_rewritten() {
        let mut connector = ScriptedConnector::new(Backend::Postgres).rows(
            "SELECT extract FROM runs WHERE d = $1",
            one_column("extract", &[json!("EXT001")]),
        );
        let handle = connector.handle();
        let params = Params::Named(
            json!({"date": "2024-01-02"}).as_object().cloned().unwrap(),
        );

        let output = RequestExecutor::new(Backend::Postgres, false)
            .query(
                &mut connector,
                &QueryRequest::new("SELECT extract FROM runs WHERE d = :date").with_params(params),
            )
            .await
            .unwrap();
        assert_eq!(output.rows().map(Rows::len), Some(1));
        assert_eq!(handle.executed()[0].params, vec![json!("2024-01-02")]);
    }

    #[tokio::test]
    async fn test_odbc_procedure() {
        let mut connector = ScriptedConnector::new(Backend::Dsn)
            .rows("{CALL dbo.extracts (?, ?)}", report_rows())
            .reply("{CALL dbo.touch}", Reply::NoDescription);
        let handle = connector.handle();
        let executor = RequestExecutor::new(Backend::Dsn, false);

        let request = ProcRequest::new("dbo.extracts")
            .with_param("2024-01-02")
            .with_param(7)
            .with_dict();
        let output = executor.proc(&mut connector, &request).await.unwrap();
        assert!(matches!(output.rows(), Some(Rows::Records(rows)) if rows.len() == 2));
        assert_eq!(
            handle.executed()[0].params,
            vec![json!("2024-01-02"), json!(7)]
        );

        let output = executor
            .proc(&mut connector, &ProcRequest::new("dbo.touch"))
            .await;
        assert_eq!(output, Ok(QueryOutput::Ack));
    }

    #[tokio::test]
    async fn test_mssql_procedure_collapse() {
        let mut connector = ScriptedConnector::new(Backend::NativeMssql)
            .procedure("none", vec![])
            .procedure("one", vec![ResultSet::new(["x"]), report_rows()])
            .procedure("many", vec![report_rows(), ResultSet::new(["y"]), report_rows()]);
        let executor = RequestExecutor::new(Backend::NativeMssql, false);

        let none = executor.proc(&mut connector, &ProcRequest::new("none")).await;
        assert_eq!(none, Ok(QueryOutput::Ack));

        let one = executor
            .proc(&mut connector, &ProcRequest::new("one"))
            .await
            .unwrap();
        assert!(matches!(one, QueryOutput::Rows(Rows::Records(ref rows)) if rows.len() == 2));

        let many = executor
            .proc(&mut connector, &ProcRequest::new("many"))
            .await
            .unwrap();
        match many {
            QueryOutput::ResultSets(sets) => assert_eq!(sets.len(), 2),
            other => panic!("expected result sets, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_procedure_unsupported() {
        for backend in [Backend::Postgres, Backend::NativeMysql] {
            let mut connector = ScriptedConnector::new(backend);
            let result = RequestExecutor::new(backend, false)
                .proc(&mut connector, &ProcRequest::new("dbo.extracts"))
                .await;
            assert_eq!(result, Err(OperationError::ProcedureUnsupported(backend)));
        }
    }

    #[test]
    fn test_odbc_call_syntax() {
        assert_eq!(odbc_call("dbo.touch", 0), "{CALL dbo.touch}");
        assert_eq!(odbc_call("dbo.load", 3), "{CALL dbo.load (?, ?, ?)}");
    }
}
