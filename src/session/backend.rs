//! Session/driver boundary.
//!
//! `SessionBackend` abstracts the underlying database driver. The statement
//! facade submits rendered SQL with its bindings, then pulls result rows in
//! windows so a row limit can pause and resume extraction. Transaction state
//! queries and control also live here.

use crate::error::BackendError;
use crate::statement::params::Binding;
use crate::statement::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to a session backend.
pub type SharedBackend = Arc<Mutex<dyn SessionBackend>>;

/// Column metadata for one result data set.
#[derive(Debug, Clone)]
pub struct DataSetMeta {
    /// Result column names, in order.
    pub columns: Vec<String>,
}

impl DataSetMeta {
    /// Create metadata from column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

/// Reply to a statement submission.
#[derive(Debug)]
pub enum ExecuteReply {
    /// Rows affected by a non-returning statement.
    Affected(u64),
    /// One opened cursor per result data set; rows are pulled via `fetch`.
    ResultSets(Vec<DataSetMeta>),
}

/// One window of rows fetched from an open data set cursor.
#[derive(Debug)]
pub struct FetchChunk {
    /// Fetched rows, each in result column order.
    pub rows: Vec<Vec<Value>>,
    /// True when the cursor has more rows beyond this chunk.
    pub has_more: bool,
}

/// Database session driver boundary.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Submit a statement with its bindings.
    ///
    /// Returning statements open one cursor per data set; their rows are
    /// retrieved with `fetch`. Non-returning statements report the affected
    /// row count directly.
    async fn execute(
        &mut self,
        sql: &str,
        bindings: &[Binding],
    ) -> Result<ExecuteReply, BackendError>;

    /// Fetch up to `max_rows` rows from the cursor of `data_set`.
    /// `None` fetches everything remaining.
    async fn fetch(
        &mut self,
        data_set: usize,
        max_rows: Option<u64>,
    ) -> Result<FetchChunk, BackendError>;

    /// Begin a transaction on the session.
    async fn begin_transaction(&mut self) -> Result<(), BackendError>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<(), BackendError>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<(), BackendError>;

    /// Whether the session runs in autocommit mode.
    fn is_autocommit(&self) -> bool;

    /// Whether the session is currently inside a transaction.
    fn in_transaction(&self) -> bool;
}
