//! The statement facade.
//!
//! `Statement` is a cheap handle over a shared implementation record and a
//! shared session backend. Copies created with `try_clone` observe the same
//! text, registries and execution state; facade-local state (the async flag,
//! the pending background execution, the parse cache) stays per-handle.

#[cfg(feature = "sql-parser")]
use crate::classifier::{self, StatementKind};
use crate::error::StatementError;
use crate::row::{RowFormatter, SimpleRowFormatter};
use crate::session::backend::{ExecuteReply, SharedBackend};
use crate::statement::builder::FormatArg;
use crate::statement::inner::{StatementInner, StepPlan};
use crate::statement::params::{Binding, Extraction, StorageKind};
use crate::statement::state::{ExecutionState, RowLimit};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

type SharedInner = Arc<Mutex<StatementInner>>;

/// Statement configuration actions, applied with [`Statement::apply`].
///
/// A closed enumeration standing in for free-form configuration hooks:
/// every supported adjustment is listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Execute one step immediately and synchronously, regardless of the
    /// async flag.
    ExecuteNow,
    /// Clear the persistent async flag.
    SetSync,
    /// Set the persistent async flag.
    SetAsync,
    /// Switch extraction storage to deque backing.
    StorageDeque,
    /// Switch extraction storage to vector backing.
    StorageVector,
    /// Switch extraction storage to list backing.
    StorageList,
    /// Storage back to deque, async flag off, full reset.
    ResetAll,
}

#[derive(Debug, Clone, Default)]
struct ParseCache {
    #[cfg(feature = "sql-parser")]
    kinds: Option<Vec<StatementKind>>,
    error: String,
}

/// A database statement: deferred text construction, typed bindings and
/// extractions, synchronous or asynchronous execution, and row-limited
/// retrieval across data sets.
pub struct Statement {
    inner: SharedInner,
    backend: SharedBackend,
    is_async: bool,
    pending: Option<JoinHandle<Result<u64, StatementError>>>,
    last_async: u64,
    formatter: Arc<dyn RowFormatter>,
    parse_cache: ParseCache,
}

impl Statement {
    /// Create an empty statement on the given session backend.
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatementInner::new())),
            backend,
            is_async: false,
            pending: None,
            last_async: 0,
            formatter: Arc::new(SimpleRowFormatter::default()),
            parse_cache: ParseCache::default(),
        }
    }

    /// Create a statement with an initial SQL fragment.
    pub fn with_sql(backend: SharedBackend, sql: &str) -> Self {
        let stmt = Self::new(backend);
        stmt.lock().push_sql(sql);
        stmt
    }

    fn lock(&self) -> MutexGuard<'_, StatementInner> {
        lock(&self.inner)
    }

    // --- text construction ------------------------------------------------

    /// Append a literal SQL fragment.
    pub fn add(&mut self, sql: &str) -> &mut Self {
        self.lock().push_sql(sql);
        self
    }

    /// Append a typed fragment via its `Display` form.
    pub fn add_fragment<T: fmt::Display>(&mut self, fragment: T) -> &mut Self {
        self.lock().push_fragment(fragment);
        self
    }

    /// Register a value for positional `{}` interpolation at render time.
    pub fn arg(&mut self, arg: impl Into<FormatArg>) -> &mut Self {
        self.lock().push_arg(arg.into());
        self
    }

    /// Render the current statement text. Re-renders on every call; the
    /// shared record may have been extended by another handle.
    pub fn to_sql(&self) -> String {
        self.lock().render()
    }

    // --- registry -----------------------------------------------------------

    /// Register an input binding.
    pub fn add_bind(&mut self, binding: Binding) -> Result<(), StatementError> {
        self.lock().add_bind(binding)
    }

    /// Register a positional binding from any convertible value.
    pub fn bind(&mut self, value: impl Into<crate::statement::value::Value>) -> Result<(), StatementError> {
        self.lock().add_bind(Binding::positional(value))
    }

    /// Remove every binding registered under `name`.
    pub fn remove_bind(&mut self, name: &str) {
        self.lock().remove_bind(name);
    }

    /// Register a sequence of bindings, optionally clearing existing ones.
    pub fn add_bindings<I>(&mut self, bindings: I, reset: bool) -> Result<(), StatementError>
    where
        I: IntoIterator<Item = Binding>,
    {
        self.lock().add_bindings(bindings, reset)
    }

    /// Register an output extraction for the current data set.
    pub fn add_extract(&mut self, extraction: Extraction) -> Result<(), StatementError> {
        self.lock().add_extract(extraction)
    }

    /// Register a sequence of extractions for the current data set.
    pub fn add_extractions<I>(&mut self, extractions: I, reset: bool) -> Result<(), StatementError>
    where
        I: IntoIterator<Item = Extraction>,
    {
        self.lock().add_extractions(extractions, reset)
    }

    /// Replace the whole extraction table; one inner sequence per data set.
    pub fn set_extraction_table(
        &mut self,
        table: Vec<Vec<Extraction>>,
    ) -> Result<(), StatementError> {
        self.lock().set_extraction_table(table)
    }

    /// Engage bulk execution mode; `None` derives the batch size from the
    /// row limit.
    pub fn set_bulk(&mut self, size: Option<u64>) -> Result<(), StatementError> {
        self.lock().set_bulk(size)
    }

    pub fn is_bulk(&self) -> bool {
        self.lock().is_bulk()
    }

    pub fn binding_count(&self) -> usize {
        self.lock().binding_count()
    }

    /// Extractions registered for the current data set.
    pub fn extraction_count(&self) -> usize {
        self.lock().extraction_count()
    }

    // --- storage and limits -------------------------------------------------

    pub fn storage(&self) -> StorageKind {
        self.lock().storage()
    }

    pub fn set_storage(&mut self, kind: StorageKind) -> Result<(), StatementError> {
        self.lock().set_storage(kind)
    }

    pub fn can_modify_storage(&self) -> bool {
        self.lock().can_modify_storage()
    }

    pub fn limit(&self) -> RowLimit {
        self.lock().limit()
    }

    /// Cap the rows retrieved per execution step.
    pub fn set_limit(&mut self, limit: RowLimit) {
        self.lock().set_limit(limit);
    }

    // --- state ---------------------------------------------------------------

    pub fn state(&self) -> ExecutionState {
        self.lock().state()
    }

    pub fn initialized(&self) -> bool {
        self.state() == ExecutionState::Initialized
    }

    pub fn paused(&self) -> bool {
        self.state() == ExecutionState::Paused
    }

    pub fn done(&self) -> bool {
        self.state() == ExecutionState::Done
    }

    // --- counters and data sets -----------------------------------------------

    pub fn affected_row_count(&self) -> u64 {
        self.lock().affected_row_count()
    }

    /// Columns in `data_set`, defaulting to the current set.
    pub fn columns_extracted(&self, data_set: Option<usize>) -> usize {
        self.lock().columns_extracted(data_set)
    }

    /// Rows extracted by the most recent step, per set.
    pub fn rows_extracted(&self, data_set: Option<usize>) -> u64 {
        self.lock().rows_extracted(data_set)
    }

    /// Cumulative rows extracted across all steps, per set.
    pub fn sub_total_row_count(&self, data_set: Option<usize>) -> u64 {
        self.lock().sub_total_row_count(data_set)
    }

    pub fn data_set_count(&self) -> usize {
        self.lock().data_set_count()
    }

    pub fn current_data_set(&self) -> usize {
        self.lock().current_data_set()
    }

    pub fn has_more_data_sets(&self) -> bool {
        self.lock().has_more_data_sets()
    }

    /// Move to the next data set; re-arms a `Done` statement when the new
    /// set still has pending rows.
    pub fn next_data_set(&mut self) -> Result<usize, StatementError> {
        self.lock().next_data_set()
    }

    pub fn previous_data_set(&mut self) -> Result<usize, StatementError> {
        self.lock().previous_data_set()
    }

    // --- execution --------------------------------------------------------------

    /// Execute one step.
    ///
    /// With the async flag set, the step is submitted to a background task
    /// and `0` is returned; retrieve the row count with [`wait`]. Otherwise
    /// the step runs inline and returns the rows extracted (or, for
    /// non-returning statements, the affected row count).
    ///
    /// `reset` recycles the extraction buffers for this step; `false`
    /// appends to them.
    ///
    /// [`wait`]: Statement::wait
    pub async fn execute(&mut self, reset: bool) -> Result<u64, StatementError> {
        if self.is_async {
            self.submit(reset).await?;
            Ok(0)
        } else {
            let select_only = self.classify_for_step();
            run_step(&self.inner, &self.backend, reset, select_only).await
        }
    }

    /// Replace the statement text with `query` and execute immediately and
    /// synchronously, regardless of the async flag.
    pub async fn execute_direct(&mut self, query: &str) -> Result<u64, StatementError> {
        self.lock().replace_text(query);
        self.parse_cache = ParseCache::default();
        let select_only = self.classify_for_step();
        run_step(&self.inner, &self.backend, true, select_only).await
    }

    /// Submit one step to a background task without flipping the persistent
    /// async flag. Any outstanding prior submission is awaited first.
    pub async fn execute_async(&mut self, reset: bool) -> Result<(), StatementError> {
        self.submit(reset).await
    }

    async fn submit(&mut self, reset: bool) -> Result<(), StatementError> {
        if self.pending.is_some() {
            self.wait(None).await?;
        }
        let select_only = self.classify_for_step();
        let inner = Arc::clone(&self.inner);
        let backend = Arc::clone(&self.backend);
        debug!("submitting background execution");
        self.pending = Some(tokio::spawn(async move {
            run_step(&inner, &backend, reset, select_only).await
        }));
        Ok(())
    }

    /// Classify the current text ahead of a fresh run and cache the outcome,
    /// returning whether the text is exclusively SELECT statements.
    ///
    /// Resumed steps and unparseable or empty text yield `None`; the step
    /// then skips the implicit transaction start and the caller owns
    /// transaction boundaries explicitly. The failure message stays
    /// retrievable through `parse_error`.
    fn classify_for_step(&mut self) -> Option<bool> {
        #[cfg(feature = "sql-parser")]
        {
            match self.state() {
                ExecutionState::Initialized | ExecutionState::Done => {}
                _ => return None,
            }
            match classifier::classify(&self.to_sql()) {
                Ok(kinds) => {
                    let verdict = if kinds.is_empty() {
                        None
                    } else {
                        Some(kinds.iter().all(|k| *k == StatementKind::Select))
                    };
                    self.parse_cache.kinds = Some(kinds);
                    self.parse_cache.error.clear();
                    verdict
                }
                Err(error) => {
                    self.parse_cache.kinds = None;
                    self.parse_cache.error = error;
                    None
                }
            }
        }
        #[cfg(not(feature = "sql-parser"))]
        {
            None
        }
    }

    /// Wait for the outstanding background execution.
    ///
    /// `None` waits forever. `Some(d)` returns `WaitTimeout` on expiry and
    /// leaves the execution pending, retrievable by a later wait. With no
    /// outstanding execution, returns the most recent async row count (`0`
    /// if the statement never ran asynchronously).
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<u64, StatementError> {
        let Some(handle) = self.pending.as_mut() else {
            return Ok(self.last_async);
        };
        let joined = match timeout {
            None => handle.await,
            Some(d) => match tokio::time::timeout(d, &mut *handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(StatementError::WaitTimeout {
                        timeout_ms: d.as_millis() as u64,
                    })
                }
            },
        };
        self.pending = None;
        let rows = joined.map_err(|e| StatementError::AsyncTask(e.to_string()))??;
        self.last_async = rows;
        Ok(rows)
    }

    /// Set or clear the persistent async flag.
    pub fn set_async(&mut self, on: bool) {
        self.is_async = on;
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    // --- configuration actions -----------------------------------------------

    /// Apply a configuration action; `ExecuteNow` returns the step's row
    /// count, everything else returns `0`.
    pub async fn apply(&mut self, action: ConfigAction) -> Result<u64, StatementError> {
        match action {
            ConfigAction::ExecuteNow => {
                let select_only = self.classify_for_step();
                run_step(&self.inner, &self.backend, true, select_only).await
            }
            ConfigAction::SetSync => {
                self.set_async(false);
                Ok(0)
            }
            ConfigAction::SetAsync => {
                self.set_async(true);
                Ok(0)
            }
            ConfigAction::StorageDeque => {
                self.set_storage(StorageKind::Deque)?;
                Ok(0)
            }
            ConfigAction::StorageVector => {
                self.set_storage(StorageKind::Vector)?;
                Ok(0)
            }
            ConfigAction::StorageList => {
                self.set_storage(StorageKind::List)?;
                Ok(0)
            }
            ConfigAction::ResetAll => {
                self.set_async(false);
                self.reset()?;
                self.set_storage(StorageKind::Deque)?;
                Ok(0)
            }
        }
    }

    // --- lifecycle ---------------------------------------------------------------

    /// Create a copy sharing this statement's implementation record and
    /// backend. An outstanding background execution is awaited first, so the
    /// copy observes a quiescent statement; its result carries over.
    pub async fn try_clone(&mut self) -> Result<Statement, StatementError> {
        self.wait(None).await?;
        Ok(Statement {
            inner: Arc::clone(&self.inner),
            backend: Arc::clone(&self.backend),
            is_async: self.is_async,
            pending: None,
            last_async: self.last_async,
            formatter: Arc::clone(&self.formatter),
            parse_cache: self.parse_cache.clone(),
        })
    }

    /// Exchange all state with another statement.
    pub fn swap(&mut self, other: &mut Statement) {
        std::mem::swap(self, other);
    }

    /// Clear text, bindings, extractions, data-set bookkeeping and the parse
    /// cache; return to `Initialized`. Storage kind and row limit survive.
    pub fn reset(&mut self) -> Result<(), StatementError> {
        self.lock().reset()?;
        self.parse_cache = ParseCache::default();
        Ok(())
    }

    /// Reset and move the statement onto a different session backend.
    pub fn reset_session(&mut self, backend: SharedBackend) -> Result<(), StatementError> {
        self.reset()?;
        self.backend = backend;
        Ok(())
    }

    // --- row formatting ---------------------------------------------------------

    pub fn set_formatter(&mut self, formatter: Arc<dyn RowFormatter>) {
        self.formatter = formatter;
    }

    pub fn formatter(&self) -> Arc<dyn RowFormatter> {
        Arc::clone(&self.formatter)
    }

    // --- classification ----------------------------------------------------------

    /// Classify the current statement text and cache the outcome. Parse
    /// failures are recorded, never raised.
    pub fn parse(&mut self) {
        #[cfg(feature = "sql-parser")]
        {
            match classifier::classify(&self.to_sql()) {
                Ok(kinds) => {
                    self.parse_cache.kinds = Some(kinds);
                    self.parse_cache.error.clear();
                }
                Err(error) => {
                    self.parse_cache.kinds = None;
                    self.parse_cache.error = error;
                }
            }
        }
    }

    /// Message of the most recent parse failure; empty when the last parse
    /// succeeded, parsing was never attempted, or classification is compiled
    /// out.
    pub fn parse_error(&self) -> &str {
        &self.parse_cache.error
    }

    /// Number of statements in the parsed text. `None` until a successful
    /// `parse`.
    pub fn statements_count(&self) -> Option<usize> {
        #[cfg(feature = "sql-parser")]
        {
            self.parse_cache.kinds.as_ref().map(Vec::len)
        }
        #[cfg(not(feature = "sql-parser"))]
        {
            None
        }
    }

    /// Whether every parsed statement is a SELECT (and at least one exists).
    pub fn is_select(&self) -> Option<bool> {
        self.all_of(StatementKindQuery::Select)
    }

    pub fn is_insert(&self) -> Option<bool> {
        self.all_of(StatementKindQuery::Insert)
    }

    pub fn is_update(&self) -> Option<bool> {
        self.all_of(StatementKindQuery::Update)
    }

    pub fn is_delete(&self) -> Option<bool> {
        self.all_of(StatementKindQuery::Delete)
    }

    /// Whether at least one parsed statement is a SELECT.
    pub fn has_select(&self) -> Option<bool> {
        self.any_of(StatementKindQuery::Select)
    }

    pub fn has_insert(&self) -> Option<bool> {
        self.any_of(StatementKindQuery::Insert)
    }

    pub fn has_update(&self) -> Option<bool> {
        self.any_of(StatementKindQuery::Update)
    }

    pub fn has_delete(&self) -> Option<bool> {
        self.any_of(StatementKindQuery::Delete)
    }

    #[cfg(feature = "sql-parser")]
    fn all_of(&self, query: StatementKindQuery) -> Option<bool> {
        let kind = query.kind();
        self.parse_cache
            .kinds
            .as_ref()
            .map(|kinds| !kinds.is_empty() && kinds.iter().all(|k| *k == kind))
    }

    #[cfg(feature = "sql-parser")]
    fn any_of(&self, query: StatementKindQuery) -> Option<bool> {
        let kind = query.kind();
        self.parse_cache
            .kinds
            .as_ref()
            .map(|kinds| kinds.iter().any(|k| *k == kind))
    }

    #[cfg(not(feature = "sql-parser"))]
    fn all_of(&self, _query: StatementKindQuery) -> Option<bool> {
        None
    }

    #[cfg(not(feature = "sql-parser"))]
    fn any_of(&self, _query: StatementKindQuery) -> Option<bool> {
        None
    }
}

/// Kinds the classifier predicates can ask about, available even with the
/// classifier compiled out.
#[derive(Debug, Clone, Copy)]
enum StatementKindQuery {
    Select,
    Insert,
    Update,
    Delete,
}

#[cfg(feature = "sql-parser")]
impl StatementKindQuery {
    fn kind(self) -> StatementKind {
        match self {
            StatementKindQuery::Select => StatementKind::Select,
            StatementKindQuery::Insert => StatementKind::Insert,
            StatementKindQuery::Update => StatementKind::Update,
            StatementKindQuery::Delete => StatementKind::Delete,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.to_sql())
            .field("state", &self.state())
            .field("is_async", &self.is_async)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

fn lock(inner: &SharedInner) -> MutexGuard<'_, StatementInner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run one execution step against the backend.
///
/// The implementation lock is taken briefly to plan and to settle the step;
/// it is never held across an await. The backend lock is held for the whole
/// driver conversation of the step.
async fn run_step(
    inner: &SharedInner,
    backend: &SharedBackend,
    reset_storage: bool,
    select_only: Option<bool>,
) -> Result<u64, StatementError> {
    let (prior, plan) = {
        let mut rec = lock(inner);
        let prior = rec.state();
        let plan = rec.begin_step()?;
        (prior, plan)
    };
    let result = drive_step(inner, backend, plan, reset_storage, select_only).await;
    if result.is_err() {
        lock(inner).fail_step(prior);
    }
    result
}

async fn drive_step(
    inner: &SharedInner,
    backend: &SharedBackend,
    plan: StepPlan,
    reset_storage: bool,
    select_only: Option<bool>,
) -> Result<u64, StatementError> {
    match plan {
        StepPlan::Fresh {
            sql,
            bindings,
            max_rows,
        } => {
            let mut session = backend.lock().await;
            if !session.is_autocommit() && !session.in_transaction() {
                // An unclassified text skips the auto-start; the caller then
                // owns transaction boundaries explicitly.
                if select_only == Some(false) {
                    debug!("starting implicit transaction");
                    session.begin_transaction().await?;
                }
            }
            debug!(bindings = bindings.len(), "submitting statement");
            match session.execute(&sql, &bindings).await? {
                ExecuteReply::Affected(count) => {
                    trace!(count, "statement affected rows");
                    Ok(lock(inner).complete_affected(count))
                }
                ExecuteReply::ResultSets(metas) => {
                    trace!(data_sets = metas.len(), "statement opened result sets");
                    if !lock(inner).open_result_sets(metas) {
                        return Ok(0);
                    }
                    let chunk = session.fetch(0, max_rows).await?;
                    Ok(lock(inner).complete_fetch(chunk, reset_storage))
                }
            }
        }
        StepPlan::Resume { data_set, max_rows } => {
            trace!(data_set, "resuming fetch");
            let chunk = backend.lock().await.fetch(data_set, max_rows).await?;
            Ok(lock(inner).complete_fetch(chunk, reset_storage))
        }
    }
}
