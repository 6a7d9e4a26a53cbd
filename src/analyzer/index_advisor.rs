/// Heuristic index suggestions from WHERE-clause shape.
///
/// The advisor never looks at a live schema. It reads the first table
/// after `FROM` and the columns compared in the `WHERE` clause, and
/// proposes a composite index over them in the order they appear. The
/// result may already exist or be redundant; it is a hint, not a plan.
use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use super::normalize::STRING_LITERAL;

static FROM_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bfrom\b").unwrap());
static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s+["`]?([A-Za-z_][\w.]*)"#).unwrap());
static WHERE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bwhere\b").unwrap());
static CLAUSE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:order|group|limit)\b").unwrap());
static COMPARED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b([A-Za-z_][\w.]*)["`]?\s*(?:>=|<=|!=|<>|=|>|<|\bin\b|\blike\b|\bis\b)"#)
        .unwrap()
});

/// Words that can sit in front of an operator without being a column.
const LOGICAL_KEYWORDS: &[&str] = &["AND", "OR", "NOT", "NULL", "TRUE", "FALSE"];

/// A proposed index: the table and the ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSuggestion {
    pub table: String,
    pub columns: Vec<String>,
}

impl IndexSuggestion {
    /// `idx_<table>_<col1>_<col2>...`, with schema dots flattened.
    pub fn index_name(&self) -> String {
        let mut name = format!("idx_{}", self.table.replace('.', "_"));
        for column in &self.columns {
            name.push('_');
            name.push_str(column);
        }
        name
    }

    /// Render as a `CREATE INDEX` statement.
    pub fn to_sql(&self) -> String {
        format!(
            "CREATE INDEX {} ON {} ({});",
            self.index_name(),
            self.table,
            self.columns.join(", ")
        )
    }
}

/// Table name following the first `FROM` keyword, if it names one.
pub fn extract_table(sql: &str) -> Option<&str> {
    let from = FROM_KEYWORD.find(sql)?;
    let caps = TABLE_NAME.captures(&sql[from.end()..])?;
    caps.get(1).map(|m| m.as_str())
}

/// Blank out the inside of string literals, keeping byte offsets intact so
/// positions found in the result index straight into the original text.
fn mask_literals(sql: &str) -> Cow<'_, str> {
    STRING_LITERAL.replace_all(sql, |caps: &Captures<'_>| {
        format!("'{}'", " ".repeat(caps[0].len() - 2))
    })
}

/// Byte range of the WHERE body within `masked`.
fn where_bounds(masked: &str) -> Option<(usize, usize)> {
    let kw = WHERE_KEYWORD.find(masked)?;
    let rest = &masked[kw.end()..];
    let len = CLAUSE_END.find(rest).map_or(rest.len(), |m| m.start());
    Some((kw.end(), kw.end() + len))
}

/// Body of the WHERE clause, up to the next ORDER/GROUP/LIMIT or the end.
/// Keywords inside string literals are ignored.
pub fn where_clause(sql: &str) -> Option<&str> {
    let (start, end) = where_bounds(&mask_literals(sql))?;
    Some(&sql[start..end])
}

/// Columns compared in the WHERE clause, in discovery order, deduplicated.
///
/// Qualifiers are stripped (`u.email` → `email`). Logical keywords and
/// tokens starting with a digit never count as columns, and nothing
/// inside a string literal is scanned.
pub fn extract_where_columns(sql: &str) -> Vec<String> {
    let masked = mask_literals(sql);
    let Some((start, end)) = where_bounds(&masked) else {
        return Vec::new();
    };
    let clause = &masked[start..end];

    let mut columns: Vec<String> = Vec::new();
    for caps in COMPARED_COLUMN.captures_iter(clause) {
        let token = &caps[1];
        if LOGICAL_KEYWORDS
            .iter()
            .any(|kw| token.eq_ignore_ascii_case(kw))
        {
            continue;
        }
        let column = token.rsplit('.').next().unwrap_or(token);
        if column.is_empty() || column.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }
    columns
}

/// Structured suggestion for a query, or `None` when there is no table or
/// no usable WHERE column.
pub fn advise(sql: &str) -> Option<IndexSuggestion> {
    let table = extract_table(sql)?;
    let columns = extract_where_columns(sql);
    if columns.is_empty() {
        return None;
    }
    Some(IndexSuggestion {
        table: table.to_string(),
        columns,
    })
}

/// `CREATE INDEX` statement suggested for a query, if any.
pub fn suggest_index(sql: &str) -> Option<String> {
    advise(sql).map(|s| s.to_sql())
}
