//! # sqlpanel
//!
//! SQL query panel for request debug toolbars.
//!
//! ## Features
//!
//! - **Per-request recording**: statements run through an instrumented engine are
//!   timed and logged against the request that ran them
//! - **Weak engine registry**: detail views re-acquire the original engine without
//!   keeping it alive
//! - **Panel view-model**: formatted SQL, URL-safe parameters, SELECT classification
//! - **Detail views**: re-run a recorded SELECT, or EXPLAIN any recorded statement
//! - **Engines**: Postgres (`tokio-postgres` / `deadpool-postgres`) and SQLite (`rusqlite`)
//!
//! ## Usage
//!
//! ```ignore
//! use sqlpanel::{PgEngine, Toolbar, ToolbarConfig};
//!
//! let toolbar = Toolbar::new(ToolbarConfig::new().with_slow_query_threshold(Duration::from_millis(100)));
//! let engine = toolbar.instrument(PgEngine::connect("postgres://localhost/app", 16)?);
//!
//! // per request
//! let scope = toolbar.begin_request("GET", "/users");
//! let db = engine.scoped(&scope);
//! db.execute("SELECT * FROM users WHERE id = $1", &[42.into()]).await?;
//! let panel = toolbar.finish_request(scope);
//! let html = panel.render();
//!
//! // detail routes
//! let app = axum::Router::new().merge(sqlpanel::routes::router(toolbar.clone()));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod interceptor;
pub mod panel;
pub mod params;
pub mod record;
pub mod registry;
pub mod sql;
pub mod toolbar;
pub mod urls;
pub mod views;

mod render;

#[cfg(feature = "http")]
pub mod routes;

pub use config::ToolbarConfig;
pub use engine::{Dialect, Engine, PgEngine, ResultSet};
pub use error::{PanelError, PanelResult};
pub use history::{HistoryEntry, RequestHistory};
pub use interceptor::{InstrumentedEngine, LoggedEngine, QueryLog, RequestScope};
pub use panel::{QueryRow, SqlPanel};
pub use params::{ParamValue, encode_params};
pub use record::{EngineId, ExecutionContext, QueryRecord, RequestId};
pub use registry::EngineRegistry;
pub use sql::{explain_statement, format_sql, is_select};
pub use toolbar::Toolbar;
pub use urls::RouteUrls;
pub use views::{QueryReport, find_query, sql_explain, sql_select};

#[cfg(feature = "sqlite")]
pub use engine::SqliteEngine;
