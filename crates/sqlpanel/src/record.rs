//! Per-request query records and the identities they refer to.

use crate::error::{PanelError, PanelResult};
use crate::params::ParamValue;
use crate::sql::is_select;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an instrumented engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EngineId(u64);

impl EngineId {
    /// Allocate a fresh identity. Identities start at 1 and are never reused.
    pub(crate) fn next() -> Self {
        Self(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw integer value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a request seen by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RequestId {
    type Err = PanelError;

    fn from_str(s: &str) -> PanelResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| PanelError::bad_request(format!("malformed request id '{s}'")))
    }
}

/// Context captured alongside an executed statement.
///
/// The panel carries it through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
    /// Optional query name/tag for identification.
    pub tag: Option<String>,
    /// Optional structured fields (low-cardinality).
    pub fields: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag to identify this query.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add a structured field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// One executed statement, as recorded by the interceptor.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    /// Engine the statement ran on. `None` when the origin is unknown.
    pub engine_id: Option<EngineId>,
    /// Wall-clock execution time.
    pub duration: Duration,
    /// The statement text as executed.
    pub statement: String,
    /// Parameters bound to the statement.
    pub parameters: Vec<ParamValue>,
    /// Execution context.
    pub context: ExecutionContext,
    /// When the statement completed.
    pub recorded_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(statement: impl Into<String>, parameters: Vec<ParamValue>) -> Self {
        Self {
            engine_id: None,
            duration: Duration::ZERO,
            statement: statement.into(),
            parameters,
            context: ExecutionContext::default(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_engine(mut self, engine_id: EngineId) -> Self {
        self.engine_id = Some(engine_id);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Duration in fractional milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }

    pub fn is_select(&self) -> bool {
        is_select(&self.statement)
    }
}
