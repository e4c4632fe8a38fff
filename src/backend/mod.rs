//! Backend Module
//!
//! The query backend the widgets read from. Everything above this layer
//! talks to the [`Backend`] trait, so tests swap in an in-memory
//! implementation and the binary wires up [`PgBackend`].

mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BackendError;

pub use postgres::PgBackend;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Shared, immutable row set as stored in the query cache.
pub type Rows = Arc<Vec<Row>>;

// == SQL Param ==
/// Positional statement parameter (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

// == Statement ==
/// A read-only statement with its parameters and optional timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
    /// Overrides the backend's default statement timeout
    pub timeout: Option<Duration>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            timeout: None,
        }
    }

    /// Appends the next positional parameter.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// == Backend Trait ==
#[async_trait]
pub trait Backend: Send + Sync {
    /// Runs `statement` and returns every row it produces.
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, BackendError>;

    /// Releases pooled connections. Further calls fail with
    /// [`BackendError::Unavailable`].
    async fn close(&self);
}
