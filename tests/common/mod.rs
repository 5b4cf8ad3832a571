//! Common test utilities for stmtkit integration tests.
//!
//! `ScriptedBackend` is an in-memory `SessionBackend` fed with a queue of
//! scripted replies, one per `execute` call. Result sets become cursors the
//! backend serves window by window, so row-limited retrieval can be
//! exercised end to end without a database. An optional artificial delay
//! makes bounded-wait behavior testable.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use stmtkit::{
    BackendError, Binding, DataSetMeta, ExecuteReply, FetchChunk, SessionBackend, Value,
};

/// One scripted result data set.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

/// Scripted reply to one `execute` call.
#[derive(Debug, Clone)]
pub enum Script {
    Affected(u64),
    ResultSets(Vec<DataSet>),
    Fail(String),
}

#[derive(Debug, Default)]
struct Cursor {
    rows: VecDeque<Vec<Value>>,
}

/// In-memory backend replaying scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: VecDeque<Script>,
    cursors: Vec<Cursor>,
    autocommit: bool,
    in_txn: bool,
    delay: Option<Duration>,
    /// SQL texts submitted, in order.
    pub executed: Vec<String>,
    /// Number of `begin_transaction` calls observed.
    pub transactions_begun: usize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            autocommit: true,
            ..Self::default()
        }
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Delay every `execute` and `fetch` by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.scripts.push_back(script);
        self
    }

    pub fn script_affected(self, count: u64) -> Self {
        self.script(Script::Affected(count))
    }

    pub fn script_rows(self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.script(Script::ResultSets(vec![DataSet::new(columns, rows)]))
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SessionBackend for ScriptedBackend {
    async fn execute(
        &mut self,
        sql: &str,
        _bindings: &[Binding],
    ) -> Result<ExecuteReply, BackendError> {
        self.pause().await;
        self.executed.push(sql.to_string());
        match self.scripts.pop_front() {
            Some(Script::Affected(count)) => Ok(ExecuteReply::Affected(count)),
            Some(Script::ResultSets(sets)) => {
                let metas = sets
                    .iter()
                    .map(|s| DataSetMeta::new(s.columns.clone()))
                    .collect();
                self.cursors = sets
                    .into_iter()
                    .map(|s| Cursor {
                        rows: s.rows.into(),
                    })
                    .collect();
                Ok(ExecuteReply::ResultSets(metas))
            }
            Some(Script::Fail(message)) => Err(BackendError::Database(message)),
            None => Err(BackendError::Protocol(
                "no scripted reply left".to_string(),
            )),
        }
    }

    async fn fetch(
        &mut self,
        data_set: usize,
        max_rows: Option<u64>,
    ) -> Result<FetchChunk, BackendError> {
        self.pause().await;
        let cursor = self.cursors.get_mut(data_set).ok_or_else(|| {
            BackendError::Protocol(format!("no open cursor for data set {data_set}"))
        })?;
        let take = match max_rows {
            Some(n) => (n as usize).min(cursor.rows.len()),
            None => cursor.rows.len(),
        };
        let rows = cursor.rows.drain(..take).collect();
        Ok(FetchChunk {
            rows,
            has_more: !cursor.rows.is_empty(),
        })
    }

    async fn begin_transaction(&mut self) -> Result<(), BackendError> {
        self.in_txn = true;
        self.transactions_begun += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), BackendError> {
        self.in_txn = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        self.in_txn = false;
        Ok(())
    }

    fn is_autocommit(&self) -> bool {
        self.autocommit
    }

    fn in_transaction(&self) -> bool {
        self.in_txn
    }
}

/// Rows of single-column integers, a common scripted shape.
pub fn int_rows(values: &[i64]) -> Vec<Vec<Value>> {
    values.iter().map(|v| vec![Value::Int(*v)]).collect()
}
