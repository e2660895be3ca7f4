//! Extraction of a single SQL statement from raw model output.
//!
//! Models rarely answer with bare SQL. Replies come wrapped in markdown
//! fences, prefixed with "Here is your query:", followed by explanations, or
//! contain several alternative statements. [`sanitize_sql`] walks the reply
//! line by line and keeps only the first statement.
//!
//! # Algorithm
//!
//! 1. Remove ```` ```sql ```` and ```` ``` ```` fence markers anywhere in the
//!    text.
//! 2. Find the first line whose trimmed, upper-cased text starts with one of
//!    [`SQL_STARTERS`]. Without such a line the result is empty.
//! 3. Collect non-blank lines from there until a prose marker
//!    ([`PROSE_MARKERS`]) or a second statement keyword appears.
//! 4. Join with single spaces and make sure the statement ends with `;`.
//!
//! Matching is anchored at the start of the trimmed line, so a keyword buried
//! mid-sentence ("you can SELECT from...") never starts a statement.
//!
//! # Example
//!
//! ```
//! use sql_query_generator::sanitize::sanitize_sql;
//!
//! let raw = "Here is your query:\nSELECT * FROM t\nHope that helps!";
//! assert_eq!(sanitize_sql(raw), "SELECT * FROM t;");
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Keywords a statement may start with.
pub const SQL_STARTERS: [&str; 6] = ["SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE"];

/// Line prefixes that mark natural language or comments after a statement.
pub const PROSE_MARKERS: [&str; 6] = ["Here", "This", "Note", ">", "#", "--"];

/// Statement terminator appended when missing.
pub const TERMINATOR: char = ';';

/// Opening (with optional language tag) and closing fence markers.
static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:sql)?").expect("valid regex"));

/// Extract exactly one SQL statement from raw model output.
///
/// Returns an empty string when no line starts with a statement keyword.
/// Callers must treat that as a failure, not as valid empty SQL.
pub fn sanitize_sql(raw: &str) -> String {
    let unfenced = FENCE_REGEX.replace_all(raw, "");
    let lines: Vec<&str> = unfenced.lines().collect();
    let Some(start) = lines.iter().position(|line| starts_statement(line)) else {
        return String::new();
    };

    let mut statement: Vec<&str> = Vec::new();
    for line in &lines[start..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_prose(line) {
            break;
        }
        if !statement.is_empty() && starts_statement(line) {
            break;
        }
        statement.push(line);
    }

    let mut sql = statement.join(" ").trim().to_string();
    if !sql.is_empty() && !sql.ends_with(TERMINATOR) {
        sql.push(TERMINATOR);
    }
    sql
}

/// Whether the trimmed line opens a statement (case-insensitive).
pub fn starts_statement(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    SQL_STARTERS
        .iter()
        .any(|starter| upper.starts_with(starter))
}

fn is_prose(line: &str) -> bool {
    PROSE_MARKERS
        .iter()
        .any(|marker| line.starts_with(marker))
}
