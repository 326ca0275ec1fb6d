//! Request validation for query and procedure calls

use sqlwrap_core::OperationError;
use sqlwrap_types::{Backend, ProcRequest, QueryRequest};

/// Validator for caller-built requests
pub struct RequestValidator;

impl RequestValidator {
    /// Create a new request validator
    pub fn new() -> Self {
        Self
    }

    /// The results flag is mandatory
    pub fn results_flag(&self, request: &QueryRequest) -> Result<bool, OperationError> {
        request.results.ok_or(OperationError::MissingResultsFlag)
    }

    /// Build the `USE` statement for a database override
    pub fn use_statement(&self, backend: Backend, database: &str) -> Result<String, OperationError> {
        let quote = backend
            .use_quote()
            .ok_or(OperationError::DatabaseSwitchUnsupported(backend))?;

        if database.trim().is_empty() {
            return Err(OperationError::InvalidDatabaseName(database.to_string()));
        }

        Ok(format!("USE {}", quote.quote(database)))
    }

    /// Procedure names must be non-empty
    pub fn procedure<'a>(&self, request: &'a ProcRequest) -> Result<&'a str, OperationError> {
        let name = request.proc.trim();
        if name.is_empty() {
            return Err(OperationError::Parameters(
                "procedure name cannot be empty".to_string(),
            ));
        }
        Ok(name)
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new()
    }
}
