use super::{Dialect, Engine, ResultSet};
use crate::error::PanelResult;
use crate::params::ParamValue;
use futures_core::future::BoxFuture;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite engine over a single `rusqlite` connection.
///
/// Statements run on the blocking thread pool; the connection is shared behind a mutex.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngine {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> PanelResult<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> PanelResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    async fn run(&self, sql: &str, params: &[ParamValue]) -> PanelResult<ResultSet> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            run_blocking(&conn, &sql, &params)
        })
        .await?
    }
}

impl Engine for SqliteEngine {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>> {
        Box::pin(self.run(sql, params))
    }
}

fn run_blocking(conn: &Connection, sql: &str, params: &[ParamValue]) -> PanelResult<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = stmt.column_count();

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(column_value(row.get_ref(idx)?));
        }
        out.push(values);
    }
    Ok(ResultSet::new(columns, out))
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::from(v),
        ValueRef::Real(v) => Value::from(v),
        ValueRef::Text(v) => Value::from(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::from(format!("<{} bytes>", v.len())),
    }
}
