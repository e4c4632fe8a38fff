//! PostgreSQL backend on a lazily connected sqlx pool.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{Backend, Row, SqlParam, Statement};
use crate::config::DatabaseConfig;
use crate::error::BackendError;

#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgBackend {
    /// Builds the pool without opening a connection, so the service starts
    /// even while the database is unreachable.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let options = PgConnectOptions::from_str(&config.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options);

        info!(
            max_connections = config.max_connections,
            statement_timeout_ms = config.statement_timeout.as_millis() as u64,
            "database pool configured"
        );

        Ok(Self {
            pool,
            statement_timeout: config.statement_timeout,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Milliseconds for `statement_timeout`. Postgres reads 0 as "no timeout"
/// and rejects values above `i32::MAX`.
fn statement_timeout_ms(timeout: Duration) -> i64 {
    timeout.as_millis().clamp(1, i32::MAX as u128) as i64
}

#[async_trait]
impl Backend for PgBackend {
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, BackendError> {
        let timeout = statement.timeout.unwrap_or(self.statement_timeout);
        let mut tx = self.pool.begin().await?;

        // SET cannot take bind parameters; the value is an integer we format.
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            statement_timeout_ms(timeout)
        ))
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT row_to_json(q)::jsonb FROM ({}) q", statement.sql);
        let mut query = sqlx::query_scalar::<_, Json<Value>>(&sql);
        for param in &statement.params {
            query = match param {
                SqlParam::Text(text) => query.bind(text.as_str()),
                SqlParam::Int(int) => query.bind(*int),
            };
        }
        let values = query.fetch_all(&mut *tx).await?;

        // Read-only use: nothing to commit.
        tx.rollback().await?;

        debug!(rows = values.len(), timeout_ms = timeout.as_millis() as u64, "statement finished");
        values
            .into_iter()
            .map(|Json(value)| match value {
                Value::Object(row) => Ok(row),
                other => Err(BackendError::Query(format!(
                    "expected a JSON object row, got {other}"
                ))),
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
