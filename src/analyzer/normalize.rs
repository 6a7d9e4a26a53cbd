/// SQL normalization for structural grouping.
///
/// Two statements that differ only in literal values or in which
/// positional parameter they bind normalize to the same pattern key,
/// which is what N+1 detection groups on.
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static POSITIONAL_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());
pub(crate) static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Wildcard substituted for positional placeholders such as `$1` or `$10`.
pub const PARAM_WILDCARD: &str = "$?";
/// Wildcard substituted for single-quoted string literals.
pub const STRING_WILDCARD: &str = "'?'";
/// Wildcard substituted for bare digit runs.
pub const NUMBER_WILDCARD: &str = "?";

/// Canonicalize a raw SQL string into a pattern key.
///
/// Placeholders are rewritten before bare digits so that `$1`, `$2` and
/// `$10` all collapse to the same `$?` marker. String literals are
/// rewritten before digits so digits inside them don't leak into the key.
///
/// Never fails: malformed fragments (e.g. an unterminated quote) are
/// left as-is apart from the rules that still apply.
pub fn normalize(sql: &str) -> String {
    let collapsed = WHITESPACE.replace_all(sql, " ");
    let params = POSITIONAL_PARAM.replace_all(collapsed.trim(), PARAM_WILDCARD);
    let strings = STRING_LITERAL.replace_all(&params, STRING_WILDCARD);
    DIGITS.replace_all(&strings, NUMBER_WILDCARD).into_owned()
}
