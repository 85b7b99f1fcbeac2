use crate::record::{QueryRecord, RequestId};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Statements recorded while serving one request, in execution order.
#[derive(Debug, Default)]
pub struct QueryLog {
    records: Mutex<Vec<QueryRecord>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, record: QueryRecord) -> usize {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push(record);
        records.len() - 1
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the records so far.
    pub fn snapshot(&self) -> Vec<QueryRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn take(&self) -> Vec<QueryRecord> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// The toolbar's view of one in-flight request.
///
/// Created by [`Toolbar::begin_request`](crate::Toolbar::begin_request) and handed
/// back to [`Toolbar::finish_request`](crate::Toolbar::finish_request). A scope
/// without a log (toolbar disabled or path excluded) records nothing.
#[derive(Debug)]
pub struct RequestScope {
    id: RequestId,
    method: String,
    path: String,
    log: Option<Arc<QueryLog>>,
    started: Instant,
}

impl RequestScope {
    pub(crate) fn new(method: impl Into<String>, path: impl Into<String>, active: bool) -> Self {
        Self {
            id: RequestId::new(),
            method: method.into(),
            path: path.into(),
            log: active.then(|| Arc::new(QueryLog::new())),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether statements executed in this scope are recorded.
    pub fn is_active(&self) -> bool {
        self.log.is_some()
    }

    pub fn log(&self) -> Option<&Arc<QueryLog>> {
        self.log.as_ref()
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}
