//! Detail routes as an `axum` router.
//!
//! ```rust,ignore
//! let toolbar = sqlpanel::Toolbar::default();
//! let app = axum::Router::new()
//!     .merge(sqlpanel::routes::router(toolbar.clone()));
//! ```

use crate::error::PanelError;
use crate::render::escape;
use crate::toolbar::Toolbar;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;

/// Router serving the SELECT replay and EXPLAIN fragments under the configured prefix.
pub fn router(toolbar: Toolbar) -> Router {
    let urls = toolbar.urls().clone();
    Router::new()
        .route(&urls.select_pattern(), get(sql_select))
        .route(&urls.explain_pattern(), get(sql_explain))
        .with_state(toolbar)
}

async fn sql_select(
    State(toolbar): State<Toolbar>,
    Path((request_id, query_index)): Path<(String, usize)>,
) -> Result<Html<String>, PanelError> {
    let report = toolbar.sql_select(&request_id, query_index).await?;
    Ok(Html(report.render("SQL SELECT")))
}

async fn sql_explain(
    State(toolbar): State<Toolbar>,
    Path((request_id, query_index)): Path<(String, usize)>,
) -> Result<Html<String>, PanelError> {
    let report = toolbar.sql_explain(&request_id, query_index).await?;
    Ok(Html(report.render("SQL EXPLAIN")))
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(target: "sqlpanel", error = %self, "detail view failed");
        }
        let body = format!(
            "<div class=\"sqlpanel-error\"><p>{}</p></div>",
            escape(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}
