//! The shared statement implementation record.
//!
//! `StatementInner` owns the canonical SQL text, the binding and extraction
//! registries, the storage kind, the row limit, the bulk-mode flag, the
//! data-set cursor and the execution state. Facade copies share one inner
//! record; all structural preconditions are enforced here so a rejected
//! operation leaves prior state untouched.

use crate::error::StatementError;
use crate::session::backend::{DataSetMeta, FetchChunk};
use crate::statement::builder::{FormatArg, SqlText};
use crate::statement::params::{Binding, Extraction, StorageKind};
use crate::statement::state::{ExecutionState, RowLimit};
use crate::statement::value::Value;

/// Per-data-set extraction bookkeeping.
#[derive(Debug, Clone, Default)]
struct DataSetStats {
    columns: usize,
    last_step_rows: u64,
    sub_total: u64,
    exhausted: bool,
}

/// Work order for one execution step, produced under the inner lock and
/// carried across the await on the backend.
#[derive(Debug)]
pub(crate) enum StepPlan {
    /// Fresh run: submit the rendered SQL and a snapshot of the bindings.
    Fresh {
        sql: String,
        bindings: Vec<Binding>,
        max_rows: Option<u64>,
    },
    /// Resume a paused statement: fetch the next window of the current set.
    Resume {
        data_set: usize,
        max_rows: Option<u64>,
    },
}

#[derive(Debug, Default)]
pub(crate) struct StatementInner {
    text: SqlText,
    bindings: Vec<Binding>,
    extractions: Vec<Vec<Extraction>>,
    storage: StorageKind,
    limit: RowLimit,
    bulk: Option<u64>,
    state: ExecutionState,
    cur_set: usize,
    sets: Vec<DataSetStats>,
    affected: u64,
}

impl StatementInner {
    pub fn new() -> Self {
        Self {
            extractions: vec![Vec::new()],
            ..Self::default()
        }
    }

    // --- text builder -------------------------------------------------

    pub fn push_sql(&mut self, fragment: &str) {
        self.text.push_sql(fragment);
    }

    pub fn push_fragment<T: std::fmt::Display>(&mut self, fragment: T) {
        self.text.push_fragment(fragment);
    }

    pub fn push_arg(&mut self, arg: FormatArg) {
        self.text.push_arg(arg);
    }

    pub fn replace_text(&mut self, sql: &str) {
        self.text.replace(sql);
    }

    pub fn render(&self) -> String {
        self.text.render()
    }

    // --- registry -----------------------------------------------------

    /// Register one binding. Fails under bulk mode or when the binding is
    /// named with an empty name.
    pub fn add_bind(&mut self, binding: Binding) -> Result<(), StatementError> {
        if self.bulk.is_some() {
            return Err(StatementError::InvalidAccess(
                "individual binding not allowed in bulk mode".to_string(),
            ));
        }
        validate_binding(&binding, self.bindings.len())?;
        self.bindings.push(binding);
        Ok(())
    }

    /// Remove every binding with the given name.
    pub fn remove_bind(&mut self, name: &str) {
        self.bindings
            .retain(|b| b.name().map_or(true, |n| n != name));
    }

    /// Register a sequence of bindings, optionally resetting existing ones
    /// first. Nothing is registered if any element is rejected.
    pub fn add_bindings<I>(&mut self, bindings: I, reset: bool) -> Result<(), StatementError>
    where
        I: IntoIterator<Item = Binding>,
    {
        if self.bulk.is_some() {
            return Err(StatementError::InvalidAccess(
                "individual binding not allowed in bulk mode".to_string(),
            ));
        }
        let incoming: Vec<Binding> = bindings.into_iter().collect();
        let base = if reset { 0 } else { self.bindings.len() };
        for (offset, binding) in incoming.iter().enumerate() {
            validate_binding(binding, base + offset)?;
        }
        if reset {
            self.bindings.clear();
        }
        self.bindings.extend(incoming);
        Ok(())
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Register one extraction for the current data set. Fails under bulk
    /// mode. The extraction's buffer adopts the statement storage kind.
    pub fn add_extract(&mut self, extraction: Extraction) -> Result<(), StatementError> {
        if self.bulk.is_some() {
            return Err(StatementError::InvalidAccess(
                "individual extraction not allowed in bulk mode".to_string(),
            ));
        }
        while self.extractions.len() <= self.cur_set {
            self.extractions.push(Vec::new());
        }
        extraction.adopt_storage(self.storage);
        self.extractions[self.cur_set].push(extraction);
        Ok(())
    }

    /// Register a sequence of extractions for the current data set,
    /// optionally resetting the set's registrations first.
    pub fn add_extractions<I>(&mut self, extractions: I, reset: bool) -> Result<(), StatementError>
    where
        I: IntoIterator<Item = Extraction>,
    {
        if self.bulk.is_some() {
            return Err(StatementError::InvalidAccess(
                "individual extraction not allowed in bulk mode".to_string(),
            ));
        }
        if reset {
            if let Some(set) = self.extractions.get_mut(self.cur_set) {
                set.clear();
            }
        }
        for ex in extractions {
            self.add_extract(ex)?;
        }
        Ok(())
    }

    /// Replace the entire extraction table; each inner sequence is one data
    /// set's extraction set.
    pub fn set_extraction_table(
        &mut self,
        table: Vec<Vec<Extraction>>,
    ) -> Result<(), StatementError> {
        if self.bulk.is_some() {
            return Err(StatementError::InvalidAccess(
                "individual extraction not allowed in bulk mode".to_string(),
            ));
        }
        for set in &table {
            for ex in set {
                ex.adopt_storage(self.storage);
            }
        }
        self.extractions = if table.is_empty() {
            vec![Vec::new()]
        } else {
            table
        };
        self.cur_set = 0;
        Ok(())
    }

    /// Extraction buffers registered for the current data set.
    pub fn extraction_count(&self) -> usize {
        self.extractions.get(self.cur_set).map_or(0, Vec::len)
    }

    fn any_extraction(&self) -> bool {
        self.extractions.iter().any(|set| !set.is_empty())
    }

    // --- bulk mode ------------------------------------------------------

    /// Engage bulk execution mode.
    ///
    /// Fails when any binding or extraction is already registered. With
    /// `size: None` the batch size is derived from the row limit, which must
    /// then not be unlimited. Bulk data transfer itself is a driver concern;
    /// the statement only carries the mode.
    pub fn set_bulk(&mut self, size: Option<u64>) -> Result<(), StatementError> {
        if !self.bindings.is_empty() || self.any_extraction() {
            return Err(StatementError::InvalidAccess(
                "bulk mode requires no pre-existing bindings or extractions".to_string(),
            ));
        }
        let size = match size {
            Some(n) => n,
            None => self.limit.max_rows().ok_or_else(|| {
                StatementError::InvalidAccess(
                    "bulk mode without explicit size requires a row limit".to_string(),
                )
            })?,
        };
        self.bulk = Some(size);
        Ok(())
    }

    pub fn is_bulk(&self) -> bool {
        self.bulk.is_some()
    }

    pub fn bulk_size(&self) -> Option<u64> {
        self.bulk
    }

    // --- storage and limit ----------------------------------------------

    /// Storage kind is mutable only while no extraction buffers exist and
    /// the statement is not mid-execution.
    pub fn can_modify_storage(&self) -> bool {
        !self.any_extraction()
            && matches!(
                self.state,
                ExecutionState::Initialized | ExecutionState::Done
            )
    }

    pub fn set_storage(&mut self, kind: StorageKind) -> Result<(), StatementError> {
        if !self.can_modify_storage() {
            return Err(StatementError::InvalidAccess(
                "storage not modifiable".to_string(),
            ));
        }
        self.storage = kind;
        Ok(())
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn set_limit(&mut self, limit: RowLimit) {
        self.limit = limit;
    }

    pub fn limit(&self) -> RowLimit {
        self.limit
    }

    // --- state and counters -----------------------------------------------

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn affected_row_count(&self) -> u64 {
        self.affected
    }

    pub fn columns_extracted(&self, data_set: Option<usize>) -> usize {
        self.set_stats(data_set).map_or(0, |s| s.columns)
    }

    pub fn rows_extracted(&self, data_set: Option<usize>) -> u64 {
        self.set_stats(data_set).map_or(0, |s| s.last_step_rows)
    }

    pub fn sub_total_row_count(&self, data_set: Option<usize>) -> u64 {
        self.set_stats(data_set).map_or(0, |s| s.sub_total)
    }

    fn set_stats(&self, data_set: Option<usize>) -> Option<&DataSetStats> {
        self.sets.get(data_set.unwrap_or(self.cur_set))
    }

    // --- data set navigation ----------------------------------------------

    /// Number of data sets: result sets once executed, otherwise the
    /// registered extraction table width.
    pub fn data_set_count(&self) -> usize {
        if self.sets.is_empty() {
            self.extractions.len()
        } else {
            self.sets.len()
        }
    }

    pub fn current_data_set(&self) -> usize {
        self.cur_set
    }

    pub fn has_more_data_sets(&self) -> bool {
        self.cur_set + 1 < self.data_set_count()
    }

    /// Move the cursor to the next data set.
    ///
    /// A `Done` statement whose new set still has pending rows transitions
    /// to `Paused`, so the following `execute` resumes fetching that set
    /// instead of re-running the whole statement.
    pub fn next_data_set(&mut self) -> Result<usize, StatementError> {
        let count = self.data_set_count();
        if self.cur_set + 1 >= count {
            return Err(StatementError::NoDataSet {
                index: self.cur_set + 1,
                count,
            });
        }
        self.cur_set += 1;
        self.wake_if_pending();
        Ok(self.cur_set)
    }

    /// Move the cursor to the previous data set.
    pub fn previous_data_set(&mut self) -> Result<usize, StatementError> {
        if self.cur_set == 0 {
            return Err(StatementError::NoDataSet {
                index: 0,
                count: self.data_set_count(),
            });
        }
        self.cur_set -= 1;
        self.wake_if_pending();
        Ok(self.cur_set)
    }

    fn wake_if_pending(&mut self) {
        if self.state == ExecutionState::Done {
            if let Some(stats) = self.sets.get(self.cur_set) {
                if !stats.exhausted {
                    self.state = ExecutionState::Paused;
                }
            }
        }
    }

    // --- execution steps ----------------------------------------------------

    /// Plan one execution step and mark the statement executing.
    ///
    /// `Initialized` and `Done` statements run fresh; `Paused` statements
    /// resume fetching the current data set.
    pub fn begin_step(&mut self) -> Result<StepPlan, StatementError> {
        match self.state {
            ExecutionState::Executing => Err(StatementError::InvalidState(
                "an execution step is already in flight".to_string(),
            )),
            ExecutionState::Initialized | ExecutionState::Done => {
                self.state = ExecutionState::Executing;
                Ok(StepPlan::Fresh {
                    sql: self.render(),
                    bindings: self.bindings.clone(),
                    max_rows: self.limit.max_rows(),
                })
            }
            ExecutionState::Paused => {
                self.state = ExecutionState::Executing;
                Ok(StepPlan::Resume {
                    data_set: self.cur_set,
                    max_rows: self.limit.max_rows(),
                })
            }
        }
    }

    /// Restore the pre-step state after a failed step.
    pub fn fail_step(&mut self, prior: ExecutionState) {
        self.state = prior;
    }

    /// Complete a step that affected rows without returning any.
    pub fn complete_affected(&mut self, count: u64) -> u64 {
        self.affected = count;
        self.sets.clear();
        self.cur_set = 0;
        self.state = ExecutionState::Done;
        count
    }

    /// Record the opened result sets of a fresh run. Returns false when the
    /// backend opened none, in which case the step completes immediately.
    pub fn open_result_sets(&mut self, metas: Vec<DataSetMeta>) -> bool {
        self.affected = 0;
        self.cur_set = 0;
        self.sets = metas
            .iter()
            .map(|m| DataSetStats {
                columns: m.columns.len(),
                ..DataSetStats::default()
            })
            .collect();
        while self.extractions.len() < self.sets.len() {
            self.extractions.push(Vec::new());
        }
        if self.sets.is_empty() {
            self.state = ExecutionState::Done;
            return false;
        }
        true
    }

    /// Route one fetched window into the current set's extraction buffers
    /// and settle the post-step state. Returns rows extracted this step.
    pub fn complete_fetch(&mut self, chunk: FetchChunk, reset_storage: bool) -> u64 {
        let set = self.cur_set;
        if reset_storage {
            if let Some(extractions) = self.extractions.get(set) {
                for ex in extractions {
                    ex.clear();
                }
            }
        }
        if let Some(extractions) = self.extractions.get(set) {
            for row in &chunk.rows {
                for ex in extractions {
                    ex.push(row.get(ex.column()).cloned().unwrap_or(Value::Null));
                }
            }
        }
        let extracted = chunk.rows.len() as u64;
        if let Some(stats) = self.sets.get_mut(set) {
            stats.last_step_rows = extracted;
            stats.sub_total += extracted;
            stats.exhausted = !chunk.has_more;
        }
        self.state = if chunk.has_more && !self.limit.is_unlimited() {
            ExecutionState::Paused
        } else {
            ExecutionState::Done
        };
        extracted
    }

    // --- reset -----------------------------------------------------------

    /// Clear text, bindings, extractions and data-set bookkeeping and return
    /// to `Initialized`. Storage kind and row limit survive a reset.
    pub fn reset(&mut self) -> Result<(), StatementError> {
        if self.state == ExecutionState::Executing {
            return Err(StatementError::InvalidState(
                "cannot reset while an execution step is in flight".to_string(),
            ));
        }
        self.text.clear();
        self.bindings.clear();
        self.extractions = vec![Vec::new()];
        self.bulk = None;
        self.sets.clear();
        self.cur_set = 0;
        self.affected = 0;
        self.state = ExecutionState::Initialized;
        Ok(())
    }

    pub fn text_is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn validate_binding(binding: &Binding, index: usize) -> Result<(), StatementError> {
    if binding.name().is_some_and(str::is_empty) {
        return Err(StatementError::Binding {
            index,
            message: "binding name must not be empty".to_string(),
        });
    }
    Ok(())
}
