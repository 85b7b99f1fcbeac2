//! Query-detail views: replay a recorded SELECT or EXPLAIN a recorded statement.
//!
//! Both views look the statement up in the request history, re-acquire the
//! engine it ran on through the registry, and execute against the live engine
//! with the recorded parameters.

use crate::engine::{Dialect, Engine, ResultSet};
use crate::error::{PanelError, PanelResult};
use crate::history::RequestHistory;
use crate::panel::SqlPanel;
use crate::record::{QueryRecord, RequestId};
use crate::registry::EngineRegistry;
use crate::render;
use crate::sql::{explain_statement, format_sql, is_select};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a detail view.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    /// Statement actually sent to the engine.
    pub statement: String,
    /// Pretty-printed form of the recorded statement.
    pub formatted_sql: String,
    pub dialect: Dialect,
    /// Rows and column headers.
    pub result: ResultSet,
    /// Duration recorded when the statement first ran.
    pub duration: Duration,
    /// Time the replay took.
    pub replay_duration: Duration,
    /// Whether rows were dropped by [`QueryReport::truncate`].
    pub truncated: bool,
}

impl QueryReport {
    /// Keep at most `max_rows` rows.
    pub fn truncate(mut self, max_rows: usize) -> Self {
        if self.result.rows.len() > max_rows {
            self.result.rows.truncate(max_rows);
            self.truncated = true;
        }
        self
    }

    /// Render as an HTML fragment under `title`.
    pub fn render(&self, title: &str) -> String {
        render::report(title, self)
    }
}

/// Locate a recorded statement of a finished request.
pub fn find_query(
    history: &RequestHistory,
    request_id: &str,
    query_index: usize,
) -> PanelResult<QueryRecord> {
    let id: RequestId = request_id.parse()?;
    let entry = history
        .get(id)
        .ok_or_else(|| PanelError::bad_request(format!("no request {request_id} in history")))?;
    let panel = entry.panel(SqlPanel::NAME).ok_or_else(|| {
        PanelError::not_found(format!("request {request_id} has no SQL panel"))
    })?;
    panel.query(query_index).cloned().ok_or_else(|| {
        PanelError::not_found(format!(
            "request {request_id} has {} queries, no query {query_index}",
            panel.queries().len()
        ))
    })
}

fn resolve_engine(registry: &EngineRegistry, query: &QueryRecord) -> PanelResult<Arc<dyn Engine>> {
    let engine_id = query
        .engine_id
        .ok_or_else(|| PanelError::bad_request("no engine recorded for this query"))?;
    registry.resolve(engine_id).ok_or_else(|| {
        tracing::warn!(target: "sqlpanel", engine = %engine_id, "engine no longer available");
        PanelError::bad_request(format!("engine {engine_id} is no longer available"))
    })
}

async fn run(
    engine: &dyn Engine,
    statement: String,
    query: &QueryRecord,
) -> PanelResult<QueryReport> {
    if let Some(param) = query.parameters.iter().find(|p| !p.is_bindable()) {
        return Err(PanelError::Param(format!(
            "recorded parameter {param} cannot be bound for replay"
        )));
    }

    let started = Instant::now();
    let result = engine.execute(&statement, &query.parameters).await?;
    let replay_duration = started.elapsed();

    tracing::debug!(
        target: "sqlpanel",
        dialect = %engine.dialect(),
        rows = result.len(),
        duration_ms = replay_duration.as_secs_f64() * 1000.0,
        "replayed statement"
    );

    Ok(QueryReport {
        statement,
        formatted_sql: format_sql(&query.statement),
        dialect: engine.dialect(),
        result,
        duration: query.duration,
        replay_duration,
        truncated: false,
    })
}

/// Re-run a recorded SELECT and return its rows.
pub async fn sql_select(
    history: &RequestHistory,
    registry: &EngineRegistry,
    request_id: &str,
    query_index: usize,
) -> PanelResult<QueryReport> {
    let query = find_query(history, request_id, query_index)?;
    if !is_select(&query.statement) {
        return Err(PanelError::bad_request("only SELECT statements can be re-run"));
    }
    let engine = resolve_engine(registry, &query)?;
    run(engine.as_ref(), query.statement.clone(), &query).await
}

/// Run EXPLAIN for a recorded statement and return the plan rows.
pub async fn sql_explain(
    history: &RequestHistory,
    registry: &EngineRegistry,
    request_id: &str,
    query_index: usize,
) -> PanelResult<QueryReport> {
    let query = find_query(history, request_id, query_index)?;
    let engine = resolve_engine(registry, &query)?;
    let statement = explain_statement(engine.dialect(), &query.statement);
    run(engine.as_ref(), statement, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use crate::params::ParamValue;
    use crate::record::EngineId;
    use crate::urls::RouteUrls;
    use futures_core::future::BoxFuture;
    use std::sync::Mutex;

    struct RecordingEngine {
        dialect: Dialect,
        executed: Mutex<Vec<(String, Vec<ParamValue>)>>,
    }

    impl RecordingEngine {
        fn new(dialect: Dialect) -> Arc<Self> {
            Arc::new(Self {
                dialect,
                executed: Mutex::new(Vec::new()),
            })
        }
    }

    impl Engine for RecordingEngine {
        fn dialect(&self) -> Dialect {
            self.dialect
        }

        fn execute<'a>(
            &'a self,
            sql: &'a str,
            params: &'a [ParamValue],
        ) -> BoxFuture<'a, PanelResult<ResultSet>> {
            Box::pin(async move {
                self.executed
                    .lock()
                    .unwrap()
                    .push((sql.to_string(), params.to_vec()));
                Ok(ResultSet::new(
                    vec!["id".to_string()],
                    (0..5).map(|i| vec![serde_json::json!(i)]).collect(),
                ))
            })
        }
    }

    struct Fixture {
        history: RequestHistory,
        registry: Arc<EngineRegistry>,
        engine: Arc<RecordingEngine>,
        request_id: String,
    }

    fn fixture(dialect: Dialect, statements: &[&str]) -> Fixture {
        fixture_with_params(dialect, statements, vec![ParamValue::Int(7)])
    }

    fn fixture_with_params(
        dialect: Dialect,
        statements: &[&str],
        params: Vec<ParamValue>,
    ) -> Fixture {
        let history = RequestHistory::new(10);
        let registry = Arc::new(EngineRegistry::new());
        let engine = RecordingEngine::new(dialect);
        let engine_id = EngineId::next();
        let erased: Arc<dyn Engine> = engine.clone();
        registry.register(engine_id, &erased);

        let queries = statements
            .iter()
            .map(|s| {
                QueryRecord::new(*s, params.clone())
                    .with_engine(engine_id)
                    .with_duration(Duration::from_millis(42))
            })
            .collect();
        let id = RequestId::new();
        let panel = SqlPanel::new(id, queries, Arc::clone(&registry), RouteUrls::new("/_dbg"));
        history.insert(HistoryEntry::new(id, "GET", "/").with_panel(Arc::new(panel)));

        Fixture {
            history,
            registry,
            engine,
            request_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_select_replays_with_recorded_params() {
        let f = fixture(Dialect::Postgres, &["SELECT * FROM users WHERE id = $1"]);
        let report = sql_select(&f.history, &f.registry, &f.request_id, 0)
            .await
            .unwrap();

        assert_eq!(report.statement, "SELECT * FROM users WHERE id = $1");
        assert_eq!(report.duration, Duration::from_millis(42));
        assert_eq!(report.result.columns, vec!["id".to_string()]);
        assert_eq!(report.result.len(), 5);
        let executed = f.engine.executed.lock().unwrap();
        assert_eq!(executed[0].1, vec![ParamValue::Int(7)]);
    }

    #[tokio::test]
    async fn test_select_rejects_non_select() {
        let f = fixture(Dialect::Postgres, &["INSERT INTO users (id) VALUES ($1)"]);
        let err = sql_select(&f.history, &f.registry, &f.request_id, 0)
            .await
            .unwrap_err();

        assert!(err.is_bad_request());
        assert!(f.engine.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explain_prefix_follows_dialect() {
        let pg = fixture(Dialect::Postgres, &["SELECT 1"]);
        let report = sql_explain(&pg.history, &pg.registry, &pg.request_id, 0)
            .await
            .unwrap();
        assert_eq!(report.statement, "EXPLAIN SELECT 1");

        let lite = fixture(Dialect::Sqlite, &["DELETE FROM t"]);
        let report = sql_explain(&lite.history, &lite.registry, &lite.request_id, 0)
            .await
            .unwrap();
        assert_eq!(report.statement, "EXPLAIN QUERY PLAN DELETE FROM t");
    }

    #[tokio::test]
    async fn test_unknown_request_is_bad_request() {
        let f = fixture(Dialect::Postgres, &["SELECT 1"]);
        let unknown = RequestId::new().to_string();

        let err = sql_select(&f.history, &f.registry, &unknown, 0).await.unwrap_err();
        assert!(err.is_bad_request());
        let err = sql_explain(&f.history, &f.registry, &unknown, 0).await.unwrap_err();
        assert!(err.is_bad_request());
        let err = sql_explain(&f.history, &f.registry, "garbage", 0).await.unwrap_err();
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_not_found() {
        let f = fixture(Dialect::Postgres, &["SELECT 1"]);
        let err = sql_select(&f.history, &f.registry, &f.request_id, 1)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_dropped_engine_is_bad_request() {
        let f = fixture(Dialect::Postgres, &["SELECT 1"]);
        let Fixture {
            history,
            registry,
            engine,
            request_id,
        } = f;
        drop(engine);

        let err = sql_select(&history, &registry, &request_id, 0).await.unwrap_err();
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_missing_engine_id_is_bad_request() {
        let history = RequestHistory::new(10);
        let registry = EngineRegistry::new();
        let id = RequestId::new();
        let panel = SqlPanel::new(
            id,
            vec![QueryRecord::new("SELECT 1", vec![])],
            Arc::new(EngineRegistry::new()),
            RouteUrls::new("/_dbg"),
        );
        history.insert(HistoryEntry::new(id, "GET", "/").with_panel(Arc::new(panel)));

        let err = sql_explain(&history, &registry, &id.to_string(), 0)
            .await
            .unwrap_err();
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_unbindable_params_are_rejected_before_replay() {
        let f = fixture_with_params(
            Dialect::Sqlite,
            &["SELECT * FROM t WHERE at = ?"],
            vec![ParamValue::opaque(&Instant::now())],
        );

        let err = sql_select(&f.history, &f.registry, &f.request_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Param(_)));
        let err = sql_explain(&f.history, &f.registry, &f.request_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Param(_)));
        assert!(f.engine.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncate_report() {
        let f = fixture(Dialect::Postgres, &["SELECT id FROM t"]);
        let report = sql_select(&f.history, &f.registry, &f.request_id, 0)
            .await
            .unwrap()
            .truncate(2);

        assert!(report.truncated);
        assert_eq!(report.result.len(), 2);
        assert!(report.render("SELECT").contains("first 2 rows"));
    }
}
