//! Optional SQL classification.
//!
//! Compiled behind the `sql-parser` feature. Statement text is parsed with
//! a dialect fallback chain (PostgreSQL, then MySQL, then the generic
//! dialect) so common vendor syntax classifies without configuration.

#[cfg(feature = "sql-parser")]
use sqlparser::ast::Statement as AstStatement;
#[cfg(feature = "sql-parser")]
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
#[cfg(feature = "sql-parser")]
use sqlparser::parser::Parser;

/// Classification of a single parsed SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Any statement that is none of the above (DDL, transaction control,
    /// vendor extensions).
    Other,
}

/// Parse `sql` and classify each contained statement.
///
/// Multi-statement text yields one entry per statement. The error string of
/// the last dialect in the fallback chain is returned when none parses.
#[cfg(feature = "sql-parser")]
pub fn classify(sql: &str) -> Result<Vec<StatementKind>, String> {
    let dialects: [&dyn Dialect; 3] = [&PostgreSqlDialect {}, &MySqlDialect {}, &GenericDialect {}];
    let mut last_err = String::new();
    for dialect in dialects {
        match Parser::parse_sql(dialect, sql) {
            Ok(statements) => {
                return Ok(statements.iter().map(kind_of).collect());
            }
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(last_err)
}

#[cfg(feature = "sql-parser")]
fn kind_of(statement: &AstStatement) -> StatementKind {
    match statement {
        AstStatement::Query(_) => StatementKind::Select,
        AstStatement::Insert(_) => StatementKind::Insert,
        AstStatement::Update { .. } => StatementKind::Update,
        AstStatement::Delete(_) => StatementKind::Delete,
        _ => StatementKind::Other,
    }
}
