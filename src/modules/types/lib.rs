//! Type definitions for sqlwrap
//!
//! This crate contains the shared type definitions used across the sqlwrap
//! workspace: the backend selector and the request/result types exchanged
//! between the wrapper and its callers.

pub mod backend;
pub mod runtime;

pub use backend::{Backend, IdentifierQuote};
pub use runtime::{Params, ProcRequest, QueryOutput, QueryRequest, QueryText, Record, Rows};
