// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Positional placeholder binding
//!
//! The client protocol hands over SQL with positional `%s` markers.
//! Numbering them as `%(k)s` before tokenization makes the parameter
//! index a pure function of the placeholder token's text, so any later
//! stage can recover it without positional bookkeeping.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^%\(([0-9]+)\)s$").expect("placeholder regex"));

/// Rewrite the k-th positional `%s` into `%(k)s`, 0-based
///
/// Every byte outside the placeholders is preserved exactly.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    let mut index = 0usize;

    while let Some(pos) = rest.find("%s") {
        out.push_str(&rest[..pos]);
        let _ = write!(out, "%({index})s");
        index += 1;
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Recover the parameter index from a numbered placeholder's text
pub fn placeholder_index(text: &str) -> Option<usize> {
    PLACEHOLDER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_placeholders_in_order() {
        assert_eq!(
            number_placeholders("SELECT \"a\" FROM \"t\" WHERE \"x\" = %s AND \"y\" IN (%s, %s)"),
            "SELECT \"a\" FROM \"t\" WHERE \"x\" = %(0)s AND \"y\" IN (%(1)s, %(2)s)"
        );
    }

    #[test]
    fn test_preserves_other_bytes() {
        let sql = "INSERT INTO \"t\" (\"a\",\"b\")  VALUES (%s,%s)";
        let bound = number_placeholders(sql);
        assert_eq!(bound.replace("%(0)s", "%s").replace("%(1)s", "%s"), sql);
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let sql = "SELECT * FROM \"t\"";
        assert_eq!(number_placeholders(sql), sql);
    }

    #[test]
    fn test_placeholder_index() {
        assert_eq!(placeholder_index("%(0)s"), Some(0));
        assert_eq!(placeholder_index("%(42)s"), Some(42));
        assert_eq!(placeholder_index("%s"), None);
        assert_eq!(placeholder_index("%(x)s"), None);
        assert_eq!(placeholder_index("NULL"), None);
    }
}
