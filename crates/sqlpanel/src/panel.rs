//! The SQL panel: per-request view-model over the recorded statements.

use crate::params::encode_params;
use crate::record::{EngineId, ExecutionContext, QueryRecord, RequestId};
use crate::registry::EngineRegistry;
use crate::render;
use crate::sql::format_sql;
use crate::urls::RouteUrls;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// One display row of the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow {
    /// Position of the statement within its request; stable identifier for the
    /// detail routes.
    pub query_index: usize,
    pub engine_id: Option<EngineId>,
    /// Whether the engine can still be resolved for replay.
    pub engine_available: bool,
    pub duration_ms: f64,
    /// Statement text as executed.
    pub raw_sql: String,
    /// Pretty-printed statement.
    pub sql: String,
    /// Form-encoded JSON of the parameters; empty when they cannot be serialized.
    pub params: String,
    pub is_select: bool,
    pub is_slow: bool,
    pub select_url: Option<String>,
    pub explain_url: Option<String>,
    pub context: ExecutionContext,
}

/// SQL panel for a single request.
#[derive(Debug)]
pub struct SqlPanel {
    request_id: RequestId,
    queries: Vec<QueryRecord>,
    registry: Arc<EngineRegistry>,
    urls: RouteUrls,
    slow_query_threshold: Option<Duration>,
}

impl SqlPanel {
    /// Name the panel is stored under in a history entry.
    pub const NAME: &'static str = "sql";

    pub fn new(
        request_id: RequestId,
        queries: Vec<QueryRecord>,
        registry: Arc<EngineRegistry>,
        urls: RouteUrls,
    ) -> Self {
        Self {
            request_id,
            queries,
            registry,
            urls,
            slow_query_threshold: None,
        }
    }

    /// Flag statements at or above `threshold` as slow.
    pub fn with_slow_query_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn nav_title(&self) -> &'static str {
        "SQL"
    }

    pub fn title(&self) -> &'static str {
        "SQL queries"
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Whether any statement was recorded.
    pub fn has_content(&self) -> bool {
        !self.queries.is_empty()
    }

    /// Statement count, or `None` when nothing was recorded.
    pub fn nav_subtitle(&self) -> Option<String> {
        self.has_content().then(|| self.queries.len().to_string())
    }

    /// Recorded statements, in execution order.
    pub fn queries(&self) -> &[QueryRecord] {
        &self.queries
    }

    pub fn query(&self, index: usize) -> Option<&QueryRecord> {
        self.queries.get(index)
    }

    pub fn total_duration(&self) -> Duration {
        self.queries.iter().map(|q| q.duration).sum()
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    /// Build the display rows.
    pub fn process_response(&self) -> Vec<QueryRow> {
        self.queries
            .iter()
            .enumerate()
            .map(|(query_index, query)| self.row(query_index, query))
            .collect()
    }

    fn row(&self, query_index: usize, query: &QueryRecord) -> QueryRow {
        let is_select = query.is_select();
        let engine_available = query
            .engine_id
            .is_some_and(|id| self.registry.resolve(id).is_some());
        let is_slow = self
            .slow_query_threshold
            .is_some_and(|threshold| query.duration >= threshold);

        let (select_url, explain_url) = match query.engine_id {
            Some(_) => (
                is_select.then(|| self.urls.select(self.request_id, query_index)),
                Some(self.urls.explain(self.request_id, query_index)),
            ),
            None => (None, None),
        };

        QueryRow {
            query_index,
            engine_id: query.engine_id,
            engine_available,
            duration_ms: query.duration_ms(),
            raw_sql: query.statement.clone(),
            sql: format_sql(&query.statement),
            params: encode_params(&query.parameters),
            is_select,
            is_slow,
            select_url,
            explain_url,
            context: query.context.clone(),
        }
    }

    /// Render the panel body as an HTML fragment.
    pub fn render(&self) -> String {
        render::panel(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn panel(queries: Vec<QueryRecord>) -> SqlPanel {
        SqlPanel::new(
            RequestId::new(),
            queries,
            Arc::new(EngineRegistry::new()),
            RouteUrls::new("/_debug_toolbar"),
        )
    }

    #[test]
    fn test_empty_panel() {
        let panel = panel(vec![]);
        assert!(!panel.has_content());
        assert_eq!(panel.nav_subtitle(), None);
        assert!(panel.process_response().is_empty());
        assert_eq!(panel.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_rows_keep_recording_order() {
        let engine_id = EngineId::next();
        let queries = vec![
            QueryRecord::new("SELECT * FROM users", vec![]).with_engine(engine_id),
            QueryRecord::new("insert into users (name) values (?)", vec!["x".into()])
                .with_engine(engine_id),
            QueryRecord::new("  select 1", vec![]).with_engine(engine_id),
        ];
        let panel = panel(queries);

        assert!(panel.has_content());
        assert_eq!(panel.nav_subtitle().as_deref(), Some("3"));

        let rows = panel.process_response();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.query_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            rows.iter().map(|r| r.is_select).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(rows[1].raw_sql, "insert into users (name) values (?)");
        assert_eq!(rows[1].params, "%5B%22x%22%5D");
    }

    #[test]
    fn test_unserializable_params_render_empty() {
        let queries = vec![QueryRecord::new(
            "SELECT $1",
            vec![ParamValue::opaque(&std::time::Instant::now())],
        )];
        let rows = panel(queries).process_response();
        assert_eq!(rows[0].params, "");
    }

    #[test]
    fn test_urls_only_for_known_engines() {
        let engine_id = EngineId::next();
        let queries = vec![
            QueryRecord::new("SELECT 1", vec![]).with_engine(engine_id),
            QueryRecord::new("DELETE FROM t", vec![]).with_engine(engine_id),
            QueryRecord::new("SELECT 2", vec![]),
        ];
        let panel = panel(queries);
        let rows = panel.process_response();
        let id = panel.request_id();

        assert_eq!(
            rows[0].select_url.as_deref(),
            Some(format!("/_debug_toolbar/sql/select/{id}/0").as_str())
        );
        assert!(rows[1].select_url.is_none());
        assert_eq!(
            rows[1].explain_url.as_deref(),
            Some(format!("/_debug_toolbar/sql/explain/{id}/1").as_str())
        );
        assert!(rows[2].select_url.is_none());
        assert!(rows[2].explain_url.is_none());
        assert!(rows.iter().all(|r| !r.engine_available));
    }

    #[test]
    fn test_slow_flag_and_total() {
        let queries = vec![
            QueryRecord::new("SELECT 1", vec![]).with_duration(Duration::from_millis(5)),
            QueryRecord::new("SELECT 2", vec![]).with_duration(Duration::from_millis(120)),
        ];
        let panel = panel(queries).with_slow_query_threshold(Some(Duration::from_millis(100)));
        let rows = panel.process_response();

        assert!(!rows[0].is_slow);
        assert!(rows[1].is_slow);
        assert_eq!(panel.total_duration(), Duration::from_millis(125));
    }

    #[test]
    fn test_render_escapes_sql() {
        let queries = vec![QueryRecord::new("SELECT '<b>' AS tag", vec![])];
        let html = panel(queries).render();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
