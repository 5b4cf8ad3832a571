//! Row formatting boundary.

use crate::statement::value::Value;

/// Renders result rows and their column headers as text.
///
/// A formatter is attached to a statement and shared by its copies; swapping
/// it changes how every copy renders.
pub trait RowFormatter: Send + Sync {
    /// Render the column name row.
    fn format_names(&self, names: &[String]) -> String;

    /// Render one value row.
    fn format_values(&self, values: &[Value]) -> String;
}

/// Default formatter: columns joined with a fixed separator.
#[derive(Debug, Clone)]
pub struct SimpleRowFormatter {
    separator: String,
}

impl SimpleRowFormatter {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for SimpleRowFormatter {
    fn default() -> Self {
        Self::new("\t")
    }
}

impl RowFormatter for SimpleRowFormatter {
    fn format_names(&self, names: &[String]) -> String {
        names.join(&self.separator)
    }

    fn format_values(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => hex::encode(b),
    }
}
