//! Engine abstraction the panel executes statements through.
//!
//! An [`Engine`] is anything that can run a statement with [`ParamValue`]s and
//! return a [`ResultSet`]. The trait is object safe so the engine registry can
//! hold `Weak<dyn Engine>` handles regardless of backend.

use crate::error::PanelResult;
use crate::params::ParamValue;
use futures_core::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

mod postgres;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use postgres::PgEngine;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEngine;

/// SQL dialect of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
    Other,
}

impl Dialect {
    /// Dialect name as shown in the UI.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgresql",
            Dialect::Sqlite => "sqlite",
            Dialect::Other => "other",
        }
    }

    /// SQLite and compatible engines use `EXPLAIN QUERY PLAN`.
    pub fn is_sqlite_family(self) -> bool {
        matches!(self, Dialect::Sqlite)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows returned by a statement, with values converted to JSON for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column headers, in result order.
    pub columns: Vec<String>,
    /// Result rows; each row has one value per column.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A database engine the toolbar can observe and replay statements against.
pub trait Engine: Send + Sync {
    /// SQL dialect spoken by this engine.
    fn dialect(&self) -> Dialect;

    /// Execute a statement and return its rows.
    ///
    /// Statements that produce no rows return an empty [`ResultSet`].
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>>;
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>> {
        (**self).execute(sql, params)
    }
}
