//! The toolbar: request lifecycle, shared engine registry and request history.

use crate::config::ToolbarConfig;
use crate::engine::Engine;
use crate::error::PanelResult;
use crate::history::{HistoryEntry, RequestHistory};
use crate::interceptor::{InstrumentedEngine, RequestScope};
use crate::panel::SqlPanel;
use crate::record::RequestId;
use crate::registry::EngineRegistry;
use crate::urls::RouteUrls;
use crate::views::{self, QueryReport};
use std::sync::Arc;

/// Entry point an application holds for the lifetime of the process.
///
/// Cloning is cheap; clones share the registry and history.
#[derive(Debug, Clone)]
pub struct Toolbar {
    config: Arc<ToolbarConfig>,
    registry: Arc<EngineRegistry>,
    history: Arc<RequestHistory>,
    urls: RouteUrls,
}

impl Toolbar {
    /// Build a toolbar. The route prefix is normalized (see [`RouteUrls`]); use
    /// [`Toolbar::try_new`] to reject an invalid configuration instead.
    pub fn new(mut config: ToolbarConfig) -> Self {
        let history = RequestHistory::new(config.max_request_history);
        let urls = RouteUrls::new(config.route_prefix.clone());
        config.route_prefix = urls.prefix().to_string();
        Self {
            config: Arc::new(config),
            registry: Arc::new(EngineRegistry::new()),
            history: Arc::new(history),
            urls,
        }
    }

    /// Validate `config` before building the toolbar.
    pub fn try_new(config: ToolbarConfig) -> PanelResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ToolbarConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<RequestHistory> {
        &self.history
    }

    pub fn urls(&self) -> &RouteUrls {
        &self.urls
    }

    /// Subscribe the toolbar to `engine`.
    pub fn instrument<E: Engine + 'static>(&self, engine: E) -> InstrumentedEngine<E> {
        InstrumentedEngine::new(engine, Arc::clone(&self.registry))
    }

    /// Subscribe the toolbar to an engine the application already shares.
    pub fn instrument_arc<E: Engine + 'static>(&self, engine: Arc<E>) -> InstrumentedEngine<E> {
        InstrumentedEngine::from_arc(engine, Arc::clone(&self.registry))
    }

    /// Open a scope for an incoming request.
    pub fn begin_request(&self, method: &str, path: &str) -> RequestScope {
        RequestScope::new(method, path, self.config.records_path(path))
    }

    /// Close a request scope and build its panel.
    ///
    /// Every request whose scope was active is kept in the history, including
    /// requests that ran no statements.
    pub fn finish_request(&self, scope: RequestScope) -> Arc<SqlPanel> {
        let queries = scope.log().map(|log| log.take()).unwrap_or_default();
        let panel = Arc::new(
            SqlPanel::new(
                scope.id(),
                queries,
                Arc::clone(&self.registry),
                self.urls.clone(),
            )
            .with_slow_query_threshold(self.config.slow_query_threshold()),
        );

        if scope.is_active() {
            tracing::debug!(
                target: "sqlpanel",
                request_id = %scope.id(),
                method = scope.method(),
                path = scope.path(),
                queries = panel.queries().len(),
                elapsed_ms = scope.started().elapsed().as_secs_f64() * 1000.0,
                "finished request"
            );
            self.history.insert(
                HistoryEntry::new(scope.id(), scope.method(), scope.path())
                    .with_panel(Arc::clone(&panel)),
            );
        }
        panel
    }

    pub fn select_url(&self, request_id: RequestId, query_index: usize) -> String {
        self.urls.select(request_id, query_index)
    }

    pub fn explain_url(&self, request_id: RequestId, query_index: usize) -> String {
        self.urls.explain(request_id, query_index)
    }

    /// Re-run a recorded SELECT, capped at `max_rows`.
    pub async fn sql_select(&self, request_id: &str, query_index: usize) -> PanelResult<QueryReport> {
        views::sql_select(&self.history, &self.registry, request_id, query_index)
            .await
            .map(|report| report.truncate(self.config.max_rows))
    }

    /// EXPLAIN a recorded statement, capped at `max_rows`.
    pub async fn sql_explain(
        &self,
        request_id: &str,
        query_index: usize,
    ) -> PanelResult<QueryReport> {
        views::sql_explain(&self.history, &self.registry, request_id, query_index)
            .await
            .map(|report| report.truncate(self.config.max_rows))
    }
}

impl Default for Toolbar {
    fn default() -> Self {
        Self::new(ToolbarConfig::default())
    }
}
