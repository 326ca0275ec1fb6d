//! Blocking connection wrapper

use sqlwrap_core::{ConnectionSettings, ConnectionTarget, OperationError, WrapperConfig, WrapperError};
use sqlwrap_types::{Backend, ProcRequest, QueryOutput, QueryRequest};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use crate::connectors::{self, Connector};
use crate::executor::RequestExecutor;
use crate::registry::ServerRegistry;

/// One live database connection with a uniform query surface
///
/// Every call blocks the current thread until the driver returns. The async
/// drivers run on a current-thread runtime owned by the wrapper, so a wrapper
/// must not be used from inside another tokio runtime.
///
/// The connection is closed by [`SqlWrapper::close`], or on drop.
pub struct SqlWrapper {
    config: WrapperConfig,
    host: String,
    executor: RequestExecutor,
    connector: Option<Box<dyn Connector>>,
    runtime: Runtime,
}

impl SqlWrapper {
    /// Resolve the server, open a connection and return the wrapper
    ///
    /// Missing credentials, a Postgres config without a database, and drivers
    /// not compiled in are reported before any network traffic. Driver
    /// failures are reported as [`WrapperError::Connection`].
    pub fn connect(
        config: WrapperConfig,
        registry: &ServerRegistry,
        settings: &ConnectionSettings,
    ) -> Result<Self, WrapperError> {
        let host = registry.resolve(&config.env, &config.server);
        let target = ConnectionTarget::build(&config, &host, settings)?;

        if config.debug {
            info!(env = %config.env, server = %config.server, host = %host, method = %config.method, "connecting");
        }

        let runtime = build_runtime()?;
        let connector = runtime.block_on(connectors::connect(&target, settings))?;

        Ok(Self::assemble(config, host, connector, runtime))
    }

    /// Wrap an already-open connector
    pub fn with_connector(
        config: WrapperConfig,
        host: impl Into<String>,
        connector: Box<dyn Connector>,
    ) -> Result<Self, WrapperError> {
        let runtime = build_runtime()?;
        Ok(Self::assemble(config, host.into(), connector, runtime))
    }

    fn assemble(
        config: WrapperConfig,
        host: String,
        connector: Box<dyn Connector>,
        runtime: Runtime,
    ) -> Self {
        Self {
            executor: RequestExecutor::new(config.method, config.debug),
            config,
            host,
            connector: Some(connector),
            runtime,
        }
    }

    /// Run a query request
    ///
    /// `Ok(QueryOutput::Ack)` for statements without rows, `Ok(QueryOutput::Rows)`
    /// for result sets (possibly empty), `Err` for any failure.
    pub fn query(&mut self, request: &QueryRequest) -> Result<QueryOutput, OperationError> {
        let connector = self
            .connector
            .as_deref_mut()
            .ok_or(OperationError::Closed)?;
        self.runtime.block_on(self.executor.query(connector, request))
    }

    /// Call a stored procedure
    pub fn proc(&mut self, request: &ProcRequest) -> Result<QueryOutput, OperationError> {
        let connector = self
            .connector
            .as_deref_mut()
            .ok_or(OperationError::Closed)?;
        self.runtime.block_on(self.executor.proc(connector, request))
    }

    /// Close the connection
    pub fn close(mut self) -> Result<(), WrapperError> {
        match self.connector.take() {
            Some(connector) => {
                debug!(host = %self.host, "closing connection");
                self.runtime.block_on(connector.close()).map_err(|e| match e {
                    e @ WrapperError::Connection { .. } => e,
                    other => WrapperError::connection(self.host.as_str(), self.config.user(), other),
                })
            }
            None => Ok(()),
        }
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    /// Physical host the logical server resolved to
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn backend(&self) -> Backend {
        self.executor.backend()
    }

    /// Advisory response format hint
    pub fn format(&self) -> Option<&str> {
        self.config.format.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.connector.is_some()
    }
}

impl Drop for SqlWrapper {
    fn drop(&mut self) {
        if let Some(connector) = self.connector.take() {
            if let Err(err) = self.runtime.block_on(connector.close()) {
                warn!(host = %self.host, error = %err, "failed to close connection");
            }
        }
    }
}

impl std::fmt::Debug for SqlWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlWrapper")
            .field("config", &self.config)
            .field("host", &self.host)
            .field("open", &self.is_open())
            .finish()
    }
}

fn build_runtime() -> Result<Runtime, WrapperError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| WrapperError::Internal(format!("failed to start driver runtime: {}", e)))
}
