//! Session handle: backend ownership, statement factory, transactions.

use crate::error::StatementError;
use crate::session::backend::{SessionBackend, SharedBackend};
use crate::statement::Statement;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owner of a shared session backend.
///
/// Statements created from a session share its backend handle; the session
/// also exposes transaction control directly.
#[derive(Clone)]
pub struct Session {
    backend: SharedBackend,
}

impl Session {
    /// Wrap a backend implementation in a session.
    pub fn new<B: SessionBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    /// Create a session from an already shared backend handle.
    pub fn from_shared(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// The shared backend handle.
    pub fn backend(&self) -> SharedBackend {
        Arc::clone(&self.backend)
    }

    /// Create an empty statement on this session.
    pub fn statement(&self) -> Statement {
        Statement::new(self.backend())
    }

    /// Create a statement with an initial SQL fragment.
    pub fn statement_with(&self, sql: &str) -> Statement {
        Statement::with_sql(self.backend(), sql)
    }

    /// Begin a transaction.
    pub async fn begin(&self) -> Result<(), StatementError> {
        self.backend.lock().await.begin_transaction().await?;
        Ok(())
    }

    /// Commit the current transaction.
    pub async fn commit(&self) -> Result<(), StatementError> {
        self.backend.lock().await.commit().await?;
        Ok(())
    }

    /// Roll back the current transaction.
    pub async fn rollback(&self) -> Result<(), StatementError> {
        self.backend.lock().await.rollback().await?;
        Ok(())
    }

    /// Whether the backend runs in autocommit mode.
    pub async fn is_autocommit(&self) -> bool {
        self.backend.lock().await.is_autocommit()
    }

    /// Whether the backend is currently inside a transaction.
    pub async fn in_transaction(&self) -> bool {
        self.backend.lock().await.in_transaction()
    }
}
