//! Bounded store of finished requests, looked up by the detail views.

use crate::panel::SqlPanel;
use crate::record::RequestId;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A finished request and the panels recorded for it.
#[derive(Debug)]
pub struct HistoryEntry {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub recorded_at: DateTime<Utc>,
    panels: BTreeMap<&'static str, Arc<SqlPanel>>,
}

impl HistoryEntry {
    pub fn new(request_id: RequestId, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id,
            method: method.into(),
            path: path.into(),
            recorded_at: Utc::now(),
            panels: BTreeMap::new(),
        }
    }

    pub fn with_panel(mut self, panel: Arc<SqlPanel>) -> Self {
        self.panels.insert(panel.name(), panel);
        self
    }

    /// Look up a panel by name.
    pub fn panel(&self, name: &str) -> Option<&Arc<SqlPanel>> {
        self.panels.get(name)
    }
}

/// Request history keeping the most recent `max_entries` requests.
#[derive(Debug)]
pub struct RequestHistory {
    max_entries: usize,
    entries: Mutex<VecDeque<Arc<HistoryEntry>>>,
}

impl RequestHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Store an entry, evicting the oldest ones beyond the bound.
    pub fn insert(&self, entry: HistoryEntry) -> Arc<HistoryEntry> {
        let entry = Arc::new(entry);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|e| e.request_id != entry.request_id);
        entries.push_back(Arc::clone(&entry));
        while entries.len() > self.max_entries {
            if let Some(evicted) = entries.pop_front() {
                tracing::trace!(
                    target: "sqlpanel",
                    request_id = %evicted.request_id,
                    "evicted request from history"
                );
            }
        }
        entry
    }

    pub fn get(&self, request_id: RequestId) -> Option<Arc<HistoryEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .rev()
            .find(|e| e.request_id == request_id)
            .cloned()
    }

    /// Entries, newest first.
    pub fn recent(&self) -> Vec<Arc<HistoryEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
