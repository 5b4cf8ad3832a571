//! Parameter bindings, result extractions and their storage backends.

use crate::statement::value::Value;
use std::collections::{LinkedList, VecDeque};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Backing container kind for extraction storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// `VecDeque` storage (default)
    #[default]
    Deque,
    /// `Vec` storage
    Vector,
    /// `LinkedList` storage
    List,
}

impl StorageKind {
    /// String form of the storage kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Deque => "deque",
            StorageKind::Vector => "vector",
            StorageKind::List => "list",
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deque" => Ok(StorageKind::Deque),
            "vector" => Ok(StorageKind::Vector),
            "list" => Ok(StorageKind::List),
            other => Err(format!("unknown storage kind: {other}")),
        }
    }
}

/// Ordered sequence of extracted values, backed by the selected storage kind.
#[derive(Debug, Clone)]
pub enum ValueBuffer {
    Deque(VecDeque<Value>),
    Vector(Vec<Value>),
    List(LinkedList<Value>),
}

impl ValueBuffer {
    /// Create an empty buffer with the given backing container.
    pub fn new(kind: StorageKind) -> Self {
        match kind {
            StorageKind::Deque => ValueBuffer::Deque(VecDeque::new()),
            StorageKind::Vector => ValueBuffer::Vector(Vec::new()),
            StorageKind::List => ValueBuffer::List(LinkedList::new()),
        }
    }

    /// The backing container kind.
    pub fn kind(&self) -> StorageKind {
        match self {
            ValueBuffer::Deque(_) => StorageKind::Deque,
            ValueBuffer::Vector(_) => StorageKind::Vector,
            ValueBuffer::List(_) => StorageKind::List,
        }
    }

    /// Append a value.
    pub fn push(&mut self, value: Value) {
        match self {
            ValueBuffer::Deque(d) => d.push_back(value),
            ValueBuffer::Vector(v) => v.push(value),
            ValueBuffer::List(l) => l.push_back(value),
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            ValueBuffer::Deque(d) => d.len(),
            ValueBuffer::Vector(v) => v.len(),
            ValueBuffer::List(l) => l.len(),
        }
    }

    /// Returns true when no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all stored values, keeping the container kind.
    pub fn clear(&mut self) {
        match self {
            ValueBuffer::Deque(d) => d.clear(),
            ValueBuffer::Vector(v) => v.clear(),
            ValueBuffer::List(l) => l.clear(),
        }
    }

    /// Snapshot of the stored values in order.
    pub fn values(&self) -> Vec<Value> {
        match self {
            ValueBuffer::Deque(d) => d.iter().cloned().collect(),
            ValueBuffer::Vector(v) => v.clone(),
            ValueBuffer::List(l) => l.iter().cloned().collect(),
        }
    }
}

/// A named or positional input parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    name: Option<String>,
    value: Value,
}

impl Binding {
    /// Create a named binding.
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    /// Create a positional binding.
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    /// The binding name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The bound value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// An output target: a result column index feeding a shared value buffer.
///
/// Extractions are cheaply cloneable; all clones observe the same buffer, so
/// the caller can keep a handle and read extracted rows after execution.
#[derive(Debug, Clone)]
pub struct Extraction {
    column: usize,
    buffer: Arc<Mutex<ValueBuffer>>,
}

impl Extraction {
    /// Create an extraction for the given result column, with the default
    /// deque storage. The statement converts the buffer to its configured
    /// storage kind on registration.
    pub fn new(column: usize) -> Self {
        Self::with_storage(column, StorageKind::default())
    }

    /// Create an extraction with an explicit storage kind.
    pub fn with_storage(column: usize, kind: StorageKind) -> Self {
        Self {
            column,
            buffer: Arc::new(Mutex::new(ValueBuffer::new(kind))),
        }
    }

    /// The result column index this extraction reads from.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Snapshot of the extracted values so far.
    pub fn rows(&self) -> Vec<Value> {
        self.lock().values()
    }

    /// Number of extracted values.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing has been extracted yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The storage kind backing this extraction.
    pub fn storage(&self) -> StorageKind {
        self.lock().kind()
    }

    pub(crate) fn push(&self, value: Value) {
        self.lock().push(value);
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Convert the backing container to `kind`. Only empty buffers are
    /// converted; a buffer already holding values keeps its kind.
    pub(crate) fn adopt_storage(&self, kind: StorageKind) {
        let mut buf = self.lock();
        if buf.is_empty() && buf.kind() != kind {
            *buf = ValueBuffer::new(kind);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ValueBuffer> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
