//! Statement interception for the SQL panel.
//!
//! Wrapping an engine in an [`InstrumentedEngine`] is the explicit subscription
//! step: nothing is hooked until an application does so. Per request, the
//! instrumented engine is bound to a [`RequestScope`] with
//! [`InstrumentedEngine::scoped`]; statements run through the resulting
//! [`LoggedEngine`] are timed and appended to that request's [`QueryLog`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlpanel::{SqliteEngine, Toolbar, ToolbarConfig};
//!
//! let toolbar = Toolbar::new(ToolbarConfig::default());
//! let engine = toolbar.instrument(SqliteEngine::open_in_memory()?);
//!
//! let scope = toolbar.begin_request("GET", "/users");
//! let db = engine.scoped(&scope);
//! db.execute("SELECT 1", &[]).await?;
//!
//! let panel = toolbar.finish_request(scope);
//! assert_eq!(panel.nav_subtitle().as_deref(), Some("1"));
//! ```

mod scope;


pub use scope::{QueryLog, RequestScope};

use crate::engine::{Dialect, Engine, ResultSet};
use crate::error::PanelResult;
use crate::params::ParamValue;
use crate::record::{EngineId, ExecutionContext, QueryRecord};
use crate::registry::EngineRegistry;
use crate::sql::truncate_sql_bytes;
use futures_core::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;

/// Longest statement prefix written to log events.
const MAX_LOGGED_SQL: usize = 200;

/// An engine wrapped for observation by the toolbar.
///
/// Cloning is cheap; clones share the engine and its identity.
pub struct InstrumentedEngine<E> {
    id: EngineId,
    engine: Arc<E>,
    registry: Arc<EngineRegistry>,
}

impl<E> Clone for InstrumentedEngine<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            engine: Arc::clone(&self.engine),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: Engine + 'static> InstrumentedEngine<E> {
    /// Wrap `engine`, allocating a new engine identity.
    pub fn new(engine: E, registry: Arc<EngineRegistry>) -> Self {
        Self::from_arc(Arc::new(engine), registry)
    }

    /// Wrap an engine the application already shares.
    pub fn from_arc(engine: Arc<E>, registry: Arc<EngineRegistry>) -> Self {
        Self {
            id: EngineId::next(),
            engine,
            registry,
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Get a reference to the inner engine.
    pub fn inner(&self) -> &Arc<E> {
        &self.engine
    }

    /// Bind this engine to a request. Statements run through the returned
    /// handle are recorded in the scope's log, if it has one.
    pub fn scoped(&self, scope: &RequestScope) -> LoggedEngine<E> {
        LoggedEngine {
            engine: self.clone(),
            log: scope.log().cloned(),
        }
    }

    fn before_execute(&self) -> Instant {
        Instant::now()
    }

    fn after_execute(
        &self,
        log: Option<&QueryLog>,
        started: Instant,
        sql: &str,
        params: &[ParamValue],
        context: ExecutionContext,
    ) {
        let duration = started.elapsed();
        let Some(log) = log else {
            return;
        };

        let engine: Arc<dyn Engine> = self.engine.clone();
        self.registry.register(self.id, &engine);

        let record = QueryRecord::new(sql, params.to_vec())
            .with_engine(self.id)
            .with_duration(duration)
            .with_context(context);
        let duration_ms = record.duration_ms();
        let index = log.push(record);

        tracing::debug!(
            target: "sqlpanel",
            engine = %self.id,
            index,
            duration_ms,
            param_count = params.len(),
            sql = %truncate_sql_bytes(sql, MAX_LOGGED_SQL),
            "recorded statement"
        );
    }
}

impl<E: Engine + 'static> Engine for InstrumentedEngine<E> {
    fn dialect(&self) -> Dialect {
        self.engine.dialect()
    }

    /// Unscoped execution: runs on the inner engine without recording.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>> {
        self.engine.execute(sql, params)
    }
}

/// An instrumented engine bound to one request's query log.
pub struct LoggedEngine<E> {
    engine: InstrumentedEngine<E>,
    log: Option<Arc<QueryLog>>,
}

impl<E> Clone for LoggedEngine<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            log: self.log.clone(),
        }
    }
}

impl<E: Engine + 'static> LoggedEngine<E> {
    pub fn engine_id(&self) -> EngineId {
        self.engine.id
    }

    /// Whether statements are being recorded.
    pub fn is_recording(&self) -> bool {
        self.log.is_some()
    }

    /// Execute with an explicit execution context.
    ///
    /// Successful statements are recorded; failures propagate unrecorded.
    pub async fn execute_with(
        &self,
        context: ExecutionContext,
        sql: &str,
        params: &[ParamValue],
    ) -> PanelResult<ResultSet> {
        let started = self.engine.before_execute();
        let result = self.engine.engine.execute(sql, params).await;

        match &result {
            Ok(_) => self
                .engine
                .after_execute(self.log.as_deref(), started, sql, params, context),
            Err(e) => tracing::debug!(
                target: "sqlpanel",
                engine = %self.engine.id,
                error = %e,
                sql = %truncate_sql_bytes(sql, MAX_LOGGED_SQL),
                "statement failed, not recorded"
            ),
        }
        result
    }

    /// Execute a statement, associating a tag with its record.
    pub async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[ParamValue],
    ) -> PanelResult<ResultSet> {
        self.execute_with(ExecutionContext::new().with_tag(tag), sql, params)
            .await
    }
}

impl<E: Engine + 'static> Engine for LoggedEngine<E> {
    fn dialect(&self) -> Dialect {
        self.engine.dialect()
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>> {
        Box::pin(self.execute_with(ExecutionContext::default(), sql, params))
    }
}
