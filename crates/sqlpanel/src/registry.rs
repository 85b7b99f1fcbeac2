//! Shared map from engine identity to a non-owning engine handle.
//!
//! Detail views replay statements on the engine that originally ran them. The
//! registry lets them re-acquire that engine without keeping it alive: entries
//! are weak, and resolving an entry whose engine was dropped yields `None`.

use crate::engine::Engine;
use crate::record::EngineId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

/// Engine registry shared by the toolbar, its panels and the detail views.
///
/// Entries are only ever added; reads may observe an expired handle.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<EngineId, Weak<dyn Engine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `engine` under `id` unless a live entry already exists.
    pub fn register(&self, id: EngineId, engine: &Arc<dyn Engine>) {
        if self.resolve(id).is_some() {
            return;
        }
        let mut engines = self.engines.write().unwrap_or_else(|e| e.into_inner());
        engines.insert(id, Arc::downgrade(engine));
    }

    /// Upgrade the handle for `id`, if registered and still alive.
    pub fn resolve(&self, id: EngineId) -> Option<Arc<dyn Engine>> {
        let engines = self.engines.read().unwrap_or_else(|e| e.into_inner());
        engines.get(&id).and_then(Weak::upgrade)
    }

    /// Whether `id` was ever registered (alive or not).
    pub fn contains(&self, id: EngineId) -> bool {
        let engines = self.engines.read().unwrap_or_else(|e| e.into_inner());
        engines.contains_key(&id)
    }

    /// Number of registered engines, including expired ones.
    pub fn len(&self) -> usize {
        self.engines.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.len())
            .finish()
    }
}
