//! Error types for sqlwrap
//!
//! Two tiers: [`WrapperError`] is raised while configuring or opening a
//! connection and is fatal to that wrapper; [`OperationError`] is the value a
//! failed `query`/`proc` call returns and never tears the wrapper down.

use sqlwrap_types::Backend;
use thiserror::Error;

/// Placeholder used when a connection attempt had no username
pub const UNKNOWN_USER: &str = "<unknown>";

/// Construction and configuration errors
#[derive(Error, Debug)]
pub enum WrapperError {
    /// Invalid wrapper configuration (selector, credentials, database)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend driver could not connect (or disconnect)
    #[error("could not connect to {host} with user {user}: message: {message}")]
    Connection {
        host: String,
        user: String,
        message: String,
    },

    /// SQL template error
    #[error("Template error: {0}")]
    Template(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WrapperError {
    /// Build the uniform connection error
    pub fn connection(host: impl Into<String>, user: Option<&str>, message: impl ToString) -> Self {
        WrapperError::Connection {
            host: host.into(),
            user: user.unwrap_or(UNKNOWN_USER).to_string(),
            message: message.to_string(),
        }
    }

    /// Returns true if the error was detected before any driver was called
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WrapperError::Config(_) | WrapperError::Validation(_) | WrapperError::EnvVarNotFound(_)
        )
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapperError::Connection { .. } => 3,
            WrapperError::Config(_)
            | WrapperError::Validation(_)
            | WrapperError::EnvVarNotFound(_)
            | WrapperError::Template(_) => 2,
            _ => 1,
        }
    }

    /// Message safe to print in scheduler logs (no driver detail)
    pub fn sanitized_message(&self) -> String {
        match self {
            WrapperError::Connection { host, user, .. } => {
                format!("could not connect to {} with user {}", host, user)
            }
            WrapperError::Internal(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Failure of a single `query` or `proc` call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    /// The request did not say whether rows are wanted
    #[error("expecting \"results\" parameter")]
    MissingResultsFlag,

    /// The query field was neither a string nor a list of strings
    #[error("\"query\" parameter invalid, expecting list or string")]
    MalformedQuery,

    /// Empty or blank database override
    #[error("invalid database name: {0}")]
    InvalidDatabaseName(String),

    /// The backend cannot switch databases on an open session
    #[error("{0} connections do not support switching databases")]
    DatabaseSwitchUnsupported(Backend),

    /// `USE <db>` was rejected
    #[error("failed to switch database to \"{database}\": {message}")]
    DatabaseSwitch { database: String, message: String },

    /// The driver rejected the statement or lost the session
    #[error("query failed: {0}")]
    Execution(String),

    /// The backend has no procedure-call mechanism
    #[error("stored procedures are not supported by {0} connections")]
    ProcedureUnsupported(Backend),

    /// Parameters could not be bound
    #[error("invalid parameters: {0}")]
    Parameters(String),

    /// The wrapper was already closed
    #[error("connection is closed")]
    Closed,
}

impl OperationError {
    /// Returns true if the caller built an invalid request
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            OperationError::MissingResultsFlag
                | OperationError::MalformedQuery
                | OperationError::InvalidDatabaseName(_)
                | OperationError::Parameters(_)
        )
    }
}

/// Result type alias using WrapperError
pub type Result<T> = std::result::Result<T, WrapperError>;
