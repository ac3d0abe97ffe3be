//! Statement execution contract.
//!
//! dbmap never opens connections itself. An [`Executor`] owns a live connection (or
//! transaction) and runs the SQL text and arguments the access layer produces. Passing a
//! transaction-backed executor serializes every statement of an operation on that transaction.

use crate::dialect::{Capabilities, Dialect};
use crate::error::{DbError, DbResult};
use crate::value::Value;
use futures_core::Stream;
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Metadata of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One result row: ordinal values plus shared column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// A row with unnamed columns, for collaborators that only report ordinals.
    pub fn from_values(values: Vec<Value>) -> Self {
        let columns: Arc<[Column]> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Column::new(format!("column{}", i + 1), v.type_name()))
            .collect();
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(idx)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key reported by the driver, where the engine exposes one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }
}

/// A stream of result rows.
///
/// Type-erased so every executor returns the same streaming type.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = DbResult<Row>> + Send>>,
}

impl RowStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A stream over rows that are already materialized.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(futures_util::stream::iter(rows.into_iter().map(Ok)))
    }
}

impl Stream for RowStream {
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// A live connection or transaction able to run statements.
pub trait Executor: Send + Sync {
    /// Prepared statement handle. Only valid on the executor that prepared it.
    type Statement: Send + Sync;

    /// Dialect used to render placeholders and dialect-specific clauses.
    fn dialect(&self) -> Dialect;

    /// Pagination syntax supported by the connected engine.
    ///
    /// The default assumes a modern engine for [`Executor::dialect`]. Executors that probe the
    /// server version should override this.
    fn capabilities(&self) -> Capabilities {
        self.dialect().capabilities()
    }

    /// Run a statement and report affected rows.
    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send;

    /// Run a query and stream its rows.
    fn query(&self, sql: &str, args: &[Value])
    -> impl Future<Output = DbResult<RowStream>> + Send;

    /// Run a query and return its first row.
    ///
    /// Returns [`DbError::NoRows`] when the query yields nothing.
    fn query_row(&self, sql: &str, args: &[Value]) -> impl Future<Output = DbResult<Row>> + Send {
        async move {
            let mut rows = self.query(sql, args).await?;
            match rows.next().await {
                Some(row) => row,
                None => Err(DbError::no_rows("query returned no rows")),
            }
        }
    }

    fn prepare(&self, sql: &str) -> impl Future<Output = DbResult<Self::Statement>> + Send;

    fn execute_prepared(
        &self,
        statement: &Self::Statement,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send;
}
