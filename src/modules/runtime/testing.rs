//! Scripted in-memory connector for unit tests

use async_trait::async_trait;
use serde_json::Value;
use sqlwrap_core::{OperationError, WrapperError};
use sqlwrap_types::Backend;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::connectors::{Connector, ResultSet, ResultSets};

/// Scripted outcome of one statement
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Rows(ResultSet),
    NoDescription,
    Fail(String),
}

/// One statement the connector saw
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub statement: String,
    pub params: Vec<Value>,
}

/// Observes a connector after it has been moved into a wrapper
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptHandle {
    log: Arc<Mutex<Vec<Executed>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptHandle {
    pub fn statements(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.statement).collect()
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.log.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedConnector {
    backend: Backend,
    replies: HashMap<String, Reply>,
    procedures: HashMap<String, Vec<ResultSet>>,
    handle: ScriptHandle,
}

impl ScriptedConnector {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            replies: HashMap::new(),
            procedures: HashMap::new(),
            handle: ScriptHandle::default(),
        }
    }

    pub fn reply(mut self, statement: &str, reply: Reply) -> Self {
        self.replies.insert(statement.to_string(), reply);
        self
    }

    pub fn rows(self, statement: &str, set: ResultSet) -> Self {
        self.reply(statement, Reply::Rows(set))
    }

    pub fn procedure(mut self, name: &str, sets: Vec<ResultSet>) -> Self {
        self.procedures.insert(name.to_string(), sets);
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }

    fn record(&self, statement: &str, params: &[Value]) {
        self.handle.log.lock().unwrap().push(Executed {
            statement: statement.to_string(),
            params: params.to_vec(),
        });
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> Result<Option<ResultSet>, OperationError> {
        self.record(statement, params);
        match self.replies.get(statement) {
            Some(Reply::Rows(set)) => Ok(Some(set.clone())),
            Some(Reply::NoDescription) => Ok(None),
            Some(Reply::Fail(message)) => Err(OperationError::Execution(message.clone())),
            None => Err(OperationError::Execution(format!(
                "unexpected statement: {}",
                statement
            ))),
        }
    }

    async fn run_command(&mut self, statement: &str) -> Result<(), OperationError> {
        self.record(statement, &[]);
        match self.replies.get(statement) {
            Some(Reply::Fail(message)) => Err(OperationError::Execution(message.clone())),
            _ => Ok(()),
        }
    }

    async fn call_procedure(
        &mut self,
        procedure: &str,
        params: &[Value],
    ) -> Result<ResultSets, OperationError> {
        if self.backend != Backend::NativeMssql {
            return Err(OperationError::ProcedureUnsupported(self.backend));
        }
        self.record(procedure, params);
        self.procedures
            .get(procedure)
            .cloned()
            .map(ResultSets::new)
            .ok_or_else(|| {
                OperationError::Execution(format!(
                    "Could not find stored procedure '{}'",
                    procedure
                ))
            })
    }

    async fn close(self: Box<Self>) -> Result<(), WrapperError> {
        self.handle.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> Backend {
        self.backend
    }
}
