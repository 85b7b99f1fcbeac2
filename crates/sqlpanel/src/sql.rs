//! Statement classification and formatting helpers.

use crate::engine::Dialect;
use sqlformat::{FormatOptions, QueryParams};

/// Whether a statement is a SELECT: the trimmed text starts with `select`,
/// compared case-insensitively.
pub fn is_select(statement: &str) -> bool {
    statement
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

/// Pretty-print a statement for display: uppercase keywords, 2-space indent.
pub fn format_sql(statement: &str) -> String {
    let options = FormatOptions {
        uppercase: Some(true),
        ..FormatOptions::default()
    };
    sqlformat::format(statement, &QueryParams::None, &options)
}

/// Build the EXPLAIN statement for `statement` in the engine's dialect.
pub fn explain_statement(dialect: Dialect, statement: &str) -> String {
    if dialect.is_sqlite_family() {
        format!("EXPLAIN QUERY PLAN {statement}")
    } else {
        format!("EXPLAIN {statement}")
    }
}

/// Truncate to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
