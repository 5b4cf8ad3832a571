//! Incremental statement text construction.
//!
//! `SqlText` accumulates string fragments and an ordered list of format
//! arguments. Rendering concatenates the fragments and, when format
//! arguments were registered, interpolates them into `{}` placeholders.

use std::fmt;

/// A scalar value destined for template interpolation, not for binding.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FormatArg {
    /// Render the argument as plain text. No SQL quoting is applied; format
    /// arguments are text templating, not parameter binding.
    fn render(&self) -> String {
        match self {
            FormatArg::Char(c) => c.to_string(),
            FormatArg::Int(i) => i.to_string(),
            FormatArg::UInt(u) => u.to_string(),
            FormatArg::Float(f) => f.to_string(),
            FormatArg::Bool(b) => b.to_string(),
            FormatArg::Text(s) => s.clone(),
        }
    }
}

impl From<char> for FormatArg {
    fn from(value: char) -> Self {
        FormatArg::Char(value)
    }
}

impl From<i8> for FormatArg {
    fn from(value: i8) -> Self {
        FormatArg::Int(value as i64)
    }
}

impl From<i16> for FormatArg {
    fn from(value: i16) -> Self {
        FormatArg::Int(value as i64)
    }
}

impl From<i32> for FormatArg {
    fn from(value: i32) -> Self {
        FormatArg::Int(value as i64)
    }
}

impl From<i64> for FormatArg {
    fn from(value: i64) -> Self {
        FormatArg::Int(value)
    }
}

impl From<u8> for FormatArg {
    fn from(value: u8) -> Self {
        FormatArg::UInt(value as u64)
    }
}

impl From<u16> for FormatArg {
    fn from(value: u16) -> Self {
        FormatArg::UInt(value as u64)
    }
}

impl From<u32> for FormatArg {
    fn from(value: u32) -> Self {
        FormatArg::UInt(value as u64)
    }
}

impl From<u64> for FormatArg {
    fn from(value: u64) -> Self {
        FormatArg::UInt(value)
    }
}

impl From<f32> for FormatArg {
    fn from(value: f32) -> Self {
        FormatArg::Float(value as f64)
    }
}

impl From<f64> for FormatArg {
    fn from(value: f64) -> Self {
        FormatArg::Float(value)
    }
}

impl From<bool> for FormatArg {
    fn from(value: bool) -> Self {
        FormatArg::Bool(value)
    }
}

impl From<String> for FormatArg {
    fn from(value: String) -> Self {
        FormatArg::Text(value)
    }
}

impl From<&str> for FormatArg {
    fn from(value: &str) -> Self {
        FormatArg::Text(value.to_string())
    }
}

/// Accumulated statement text: literal fragments plus format arguments.
#[derive(Debug, Clone, Default)]
pub(crate) struct SqlText {
    fragments: Vec<String>,
    args: Vec<FormatArg>,
}

impl SqlText {
    /// Append a literal SQL fragment.
    pub fn push_sql(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }

    /// Append a typed fragment via its `Display` form.
    pub fn push_fragment<T: fmt::Display>(&mut self, fragment: T) {
        self.fragments.push(fragment.to_string());
    }

    /// Register a value for template interpolation.
    pub fn push_arg(&mut self, arg: FormatArg) {
        self.args.push(arg);
    }

    /// Returns true when no fragments have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Replace the accumulated text with a single fragment, dropping any
    /// registered format arguments.
    pub fn replace(&mut self, sql: &str) {
        self.fragments.clear();
        self.args.clear();
        self.fragments.push(sql.to_string());
    }

    /// Drop all fragments and format arguments.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.args.clear();
    }

    /// Render the final statement text.
    ///
    /// Fragments are concatenated in registration order. When format
    /// arguments exist, each `{}` placeholder is replaced by the next
    /// argument in order; `{{` and `}}` render literal braces; placeholders
    /// beyond the argument list are left verbatim and surplus arguments are
    /// ignored.
    pub fn render(&self) -> String {
        let joined = self.fragments.concat();
        if self.args.is_empty() {
            return joined;
        }
        interpolate(&joined, &self.args)
    }
}

fn interpolate(template: &str, args: &[FormatArg]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' if chars.peek() == Some(&'}') => {
                chars.next();
                if next < args.len() {
                    out.push_str(&args[next].render());
                    next += 1;
                } else {
                    out.push_str("{}");
                }
            }
            _ => out.push(c),
        }
    }
    out
}
