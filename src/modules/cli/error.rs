//! CLI error type

use sqlwrap_core::{OperationError, WrapperError};
use thiserror::Error;

/// Failure of a CLI command
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration, template or connection failure
    #[error(transparent)]
    Wrapper(#[from] WrapperError),

    /// The statement or procedure call failed
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Bad command-line input
    #[error("invalid argument: {0}")]
    Usage(String),
}

impl CliError {
    /// Process exit code
    ///
    /// Operational failures exit with 1; wrapper errors use their own codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Wrapper(e) => e.exit_code(),
            CliError::Operation(_) => 1,
            CliError::Usage(_) => 2,
        }
    }

    /// Message for stderr; driver detail only when `verbose`
    pub fn report(&self, verbose: bool) -> String {
        match self {
            CliError::Wrapper(e) if !verbose => e.sanitized_message(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Wrapper(WrapperError::Io(e))
    }
}
