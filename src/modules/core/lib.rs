//! Core domain logic for sqlwrap
//!
//! This crate contains the wrapper configuration record, the per-backend
//! connection descriptors, process-wide settings, and the error taxonomy.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{OperationError, WrapperError};
