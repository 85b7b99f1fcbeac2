//! URL generation for the query-detail routes.

use crate::record::RequestId;

/// Builds detail-route URLs under a fixed prefix.
///
/// The prefix is normalized to start with `/` and carry no trailing `/`, so
/// `"_debug/"` and `"/_debug"` produce the same routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUrls {
    prefix: String,
}

impl RouteUrls {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Route pattern for SELECT replay, in axum path syntax.
    pub fn select_pattern(&self) -> String {
        format!("{}/sql/select/{{request_id}}/{{query_index}}", self.prefix)
    }

    /// Route pattern for EXPLAIN, in axum path syntax.
    pub fn explain_pattern(&self) -> String {
        format!("{}/sql/explain/{{request_id}}/{{query_index}}", self.prefix)
    }

    pub fn select(&self, request_id: RequestId, query_index: usize) -> String {
        format!("{}/sql/select/{request_id}/{query_index}", self.prefix)
    }

    pub fn explain(&self, request_id: RequestId, query_index: usize) -> String {
        format!("{}/sql/explain/{request_id}/{query_index}", self.prefix)
    }
}
