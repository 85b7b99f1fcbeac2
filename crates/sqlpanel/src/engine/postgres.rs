use super::{Dialect, Engine, ResultSet};
use crate::error::PanelResult;
use crate::params::ParamValue;
use futures_core::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Client, Row};

enum Source {
    Client(Arc<Client>),
    #[cfg(feature = "pool")]
    Pool(deadpool_postgres::Pool),
}

/// Postgres engine over a single client or a `deadpool-postgres` pool.
pub struct PgEngine {
    source: Source,
}

impl PgEngine {
    /// Use an already connected client.
    pub fn from_client(client: Arc<Client>) -> Self {
        Self {
            source: Source::Client(client),
        }
    }

    /// Check out a pooled connection per statement.
    #[cfg(feature = "pool")]
    pub fn from_pool(pool: deadpool_postgres::Pool) -> Self {
        Self {
            source: Source::Pool(pool),
        }
    }

    /// Create a pooled engine from a database URL (`NoTls`).
    #[cfg(feature = "pool")]
    pub fn connect(database_url: &str, max_size: usize) -> PanelResult<Self> {
        use crate::error::PanelError;
        use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};

        let pg_config: tokio_postgres::Config = database_url.parse()?;
        let mgr = Manager::from_config(
            pg_config,
            tokio_postgres::NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(mgr)
            .max_size(max_size)
            .build()
            .map_err(|e| PanelError::Pool(e.to_string()))?;
        Ok(Self::from_pool(pool))
    }

    async fn run(&self, sql: &str, params: &[ParamValue]) -> PanelResult<ResultSet> {
        match &self.source {
            Source::Client(client) => run_on(client, sql, params).await,
            #[cfg(feature = "pool")]
            Source::Pool(pool) => {
                let client = pool.get().await?;
                run_on(&client, sql, params).await
            }
        }
    }
}

impl Engine for PgEngine {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [ParamValue],
    ) -> BoxFuture<'a, PanelResult<ResultSet>> {
        Box::pin(self.run(sql, params))
    }
}

async fn run_on(client: &Client, sql: &str, params: &[ParamValue]) -> PanelResult<ResultSet> {
    let statement = client.prepare(sql).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    let rows = client.query(&statement, &refs).await?;

    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|idx| column_value(row, idx)).collect())
        .collect();
    Ok(ResultSet::new(columns, rows))
}

/// Typed access to the cells of a result row.
trait Cells {
    fn column_type(&self, idx: usize) -> &Type;

    /// `None` when the column cannot be read as `T`.
    fn cell<'a, T: FromSql<'a>>(&'a self, idx: usize) -> Option<Option<T>>;
}

impl Cells for Row {
    fn column_type(&self, idx: usize) -> &Type {
        self.columns()[idx].type_()
    }

    fn cell<'a, T: FromSql<'a>>(&'a self, idx: usize) -> Option<Option<T>> {
        self.try_get::<_, Option<T>>(idx).ok()
    }
}

fn column_value<C: Cells>(row: &C, idx: usize) -> Value {
    let ty = row.column_type(idx);

    let value = if *ty == Type::BOOL {
        row.cell::<bool>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT2 {
        row.cell::<i16>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT4 {
        row.cell::<i32>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT8 {
        row.cell::<i64>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::FLOAT4 {
        row.cell::<f32>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::FLOAT8 {
        row.cell::<f64>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.cell::<Value>(idx)
    } else if *ty == Type::UUID {
        row.cell::<uuid::Uuid>(idx).map(|v| v.map(|u| Value::from(u.to_string())))
    } else if *ty == Type::TIMESTAMPTZ {
        row.cell::<chrono::DateTime<chrono::Utc>>(idx).map(|v| v.map(|t| Value::from(t.to_rfc3339())))
    } else if *ty == Type::TIMESTAMP {
        row.cell::<chrono::NaiveDateTime>(idx).map(|v| v.map(|t| Value::from(t.to_string())))
    } else if *ty == Type::DATE {
        row.cell::<chrono::NaiveDate>(idx).map(|v| v.map(|t| Value::from(t.to_string())))
    } else if *ty == Type::BYTEA {
        row.cell::<Vec<u8>>(idx).map(|v| v.map(|b| Value::from(format!("<{} bytes>", b.len()))))
    } else {
        row.cell::<String>(idx).map(|v| v.map(Value::from))
    };

    match value {
        Some(Some(v)) => v,
        Some(None) => Value::Null,
        None => Value::from(format!("<{}>", ty.name())),
    }
}
