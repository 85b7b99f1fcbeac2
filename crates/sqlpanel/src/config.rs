use crate::error::{PanelError, PanelResult};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the toolbar and its SQL panel.
///
/// Recording is enabled by default. Can be built in code or read from TOML:
///
/// ```toml
/// enabled = true
/// max_request_history = 50
/// slow_query_threshold_ms = 250
/// route_prefix = "/_debug_toolbar"
/// exclude_paths = ["/static", "/health"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolbarConfig {
    /// Whether requests are recorded at all.
    pub enabled: bool,
    /// Number of finished requests kept for the detail views.
    pub max_request_history: usize,
    /// Statements at or above this many milliseconds are flagged as slow.
    /// Fractions are allowed.
    pub slow_query_threshold_ms: Option<f64>,
    /// Prefix of the detail routes. Requests under it are never recorded.
    pub route_prefix: String,
    /// Path prefixes that are never recorded.
    pub exclude_paths: Vec<String>,
    /// Maximum number of result rows shown by the detail views.
    pub max_rows: usize,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_request_history: 100,
            slow_query_threshold_ms: None,
            route_prefix: "/_debug_toolbar".to_string(),
            exclude_paths: Vec::new(),
            max_rows: 1000,
        }
    }
}

impl ToolbarConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> PanelResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| PanelError::Config(format!("failed to parse toolbar config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the toolbar relies on.
    pub fn validate(&self) -> PanelResult<()> {
        if self.max_request_history == 0 {
            return Err(PanelError::Config(
                "max_request_history must be at least 1".to_string(),
            ));
        }
        let prefix = &self.route_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(PanelError::Config(format!(
                "route_prefix must be empty or start with '/' and not end with '/': {:?}",
                self.route_prefix
            )));
        }
        if let Some(ms) = self.slow_query_threshold_ms {
            if !ms.is_finite() || ms < 0.0 {
                return Err(PanelError::Config(format!(
                    "slow_query_threshold_ms must be a non-negative number: {ms}"
                )));
            }
        }
        Ok(())
    }

    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the number of finished requests kept in history.
    pub fn with_max_request_history(mut self, max: usize) -> Self {
        self.max_request_history = max;
        self
    }

    /// Set the slow statement threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold_ms = Some(threshold.as_secs_f64() * 1000.0);
        self
    }

    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    /// Never record requests whose path starts with `prefix`.
    pub fn exclude_path(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_paths.push(prefix.into());
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.slow_query_threshold_ms
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
    }

    /// Whether a request to `path` should be recorded.
    pub fn records_path(&self, path: &str) -> bool {
        let toolbar_path = !self.route_prefix.is_empty() && path.starts_with(&self.route_prefix);
        self.enabled
            && !toolbar_path
            && !self.exclude_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolbarConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_request_history, 100);
        assert!(config.slow_query_threshold().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = ToolbarConfig::from_toml_str(
            r#"
            max_request_history = 5
            slow_query_threshold_ms = 250
            exclude_paths = ["/static"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_request_history, 5);
        assert_eq!(config.slow_query_threshold(), Some(Duration::from_millis(250)));
        assert_eq!(config.route_prefix, "/_debug_toolbar");
        assert!(!config.records_path("/static/app.css"));
        assert!(config.records_path("/users"));
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_invalid() {
        assert!(ToolbarConfig::from_toml_str("colour = \"red\"").is_err());
        let err = ToolbarConfig::from_toml_str("max_request_history = 0").unwrap_err();
        assert!(matches!(err, PanelError::Config(_)));
        assert!(ToolbarConfig::from_toml_str("route_prefix = \"debug/\"").is_err());
        assert!(ToolbarConfig::from_toml_str("slow_query_threshold_ms = -1.0").is_err());
    }

    #[test]
    fn test_sub_millisecond_threshold_is_kept() {
        let config = ToolbarConfig::new().with_slow_query_threshold(Duration::from_micros(500));
        let threshold = config.slow_query_threshold().unwrap();
        assert!(threshold > Duration::from_micros(499));
        assert!(threshold < Duration::from_micros(501));

        let config = ToolbarConfig::from_toml_str("slow_query_threshold_ms = 0.25").unwrap();
        let threshold = config.slow_query_threshold().unwrap();
        assert!(threshold > Duration::from_micros(249));
        assert!(threshold < Duration::from_micros(251));
    }

    #[test]
    fn test_records_path() {
        let config = ToolbarConfig::new().exclude_path("/health");
        assert!(config.records_path("/"));
        assert!(!config.records_path("/health"));
        assert!(!config.records_path("/_debug_toolbar/sql/select/x/0"));
        assert!(!config.clone().disable().records_path("/"));
    }
}
