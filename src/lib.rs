//! # stmtkit
//!
//! Driver-agnostic SQL statement facade with deferred query construction,
//! typed bindings and extractions, synchronous and asynchronous execution,
//! and pausable row-limited retrieval across multiple data sets.
//!
//! Statements are built incrementally, carry their own input bindings and
//! output extraction buffers, and run against any driver implementing the
//! [`SessionBackend`] trait. A row limit turns execution into a sequence of
//! resumable steps; the optional `sql-parser` feature classifies statement
//! text so non-SELECT statements can open transactions implicitly on
//! non-autocommit sessions.
//!
//! ## Example
//!
//! ```no_run
//! # use stmtkit::*;
//! # async fn example(session: Session) -> Result<(), StatementError> {
//! let names = Extraction::new(0);
//!
//! let mut stmt = session.statement_with("SELECT name FROM person WHERE age > {}");
//! stmt.arg(30);
//! stmt.set_limit(RowLimit::Rows(50));
//! stmt.add_extract(names.clone())?;
//!
//! // Each step retrieves up to 50 rows until the result set is exhausted.
//! while !stmt.done() {
//!     stmt.execute(true).await?;
//!     for name in names.rows() {
//!         println!("{name:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod classifier;
pub mod error;
pub mod row;
pub mod session;
pub mod statement;

// Re-export public API
pub use classifier::StatementKind;
pub use error::{BackendError, StatementError};
pub use row::{RowFormatter, SimpleRowFormatter};
pub use session::{
    DataSetMeta, ExecuteReply, FetchChunk, Session, SessionBackend, SharedBackend,
};
pub use statement::{
    Binding, ConfigAction, ExecutionState, Extraction, FormatArg, RowLimit, Statement,
    StorageKind, Value, ValueBuffer,
};
