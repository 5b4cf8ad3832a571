//! Statement layer: text construction, registries, state and the facade.

pub mod builder;
mod facade;
mod inner;
pub mod params;
pub mod state;
pub mod value;

pub use builder::FormatArg;
pub use facade::{ConfigAction, Statement};
pub use params::{Binding, Extraction, StorageKind, ValueBuffer};
pub use state::{ExecutionState, RowLimit};
pub use value::Value;
