// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Identifier resolution through per-query alias scopes
//!
//! [`SqlIdent`] is a lazy, non-owning view over one token. Each
//! accessor fails with [`TranspileError::MalformedIdentifier`] when the
//! underlying token has the wrong shape, e.g. asking for `left_table`
//! on something that is not a comparison.
//!
//! ## Alias resolution
//!
//! For a qualified name `q.c` the qualifier is looked up in the alias
//! map; if it resolves, the aliased target's table is returned,
//! otherwise the qualifier itself. An unqualified name resolves through
//! the map as well, falling back to the name itself — which means an
//! unqualified column's "table" is its own name. Field emission
//! compares that table against the query's left table, so the fallback
//! collapses to a bare column key exactly when it should.

use std::collections::HashMap;

use sql2mongo_tokenizer::{GroupKind, Token, placeholder_index};

use crate::error::{TranspileError, TranspileResult};

/// Resolution target recorded for one alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub qualifier: Option<String>,
    pub name: String,
}

impl AliasTarget {
    /// Table this target resolves to
    pub fn table(&self, aliases: &AliasMap) -> String {
        resolve_table(aliases, self.qualifier.as_deref(), &self.name)
    }
}

/// Per-query mapping from alias name to its resolution target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: HashMap<String, AliasTarget>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, target: AliasTarget) {
        self.entries.insert(alias.into(), target);
    }

    pub fn get(&self, name: &str) -> Option<&AliasTarget> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the table of a `(qualifier, name)` pair through the alias map
pub fn resolve_table(aliases: &AliasMap, qualifier: Option<&str>, name: &str) -> String {
    if let Some(q) = qualifier {
        return match aliases.get(q) {
            Some(target) => target.table(aliases),
            None => q.to_string(),
        };
    }
    match aliases.get(name) {
        // the guard breaks self-referential entries
        Some(target) if target.qualifier.is_some() || target.name != name => {
            target.table(aliases)
        }
        _ => name.to_string(),
    }
}

/// Table a column reference belongs to at emission time
///
/// Unlike [`resolve_table`], an unqualified column that is not an alias
/// defaults to the query's left table rather than its own name.
pub fn column_table(
    aliases: &AliasMap,
    left_table: &str,
    qualifier: Option<&str>,
    column: &str,
) -> String {
    match qualifier {
        Some(q) => match aliases.get(q) {
            Some(target) => target.table(aliases),
            None => q.to_string(),
        },
        None => match aliases.get(column) {
            Some(target) => target.table(aliases),
            None => left_table.to_string(),
        },
    }
}

/// Build the emitted field key for a column reference
///
/// A column on the query's left table emits as a bare key; anything
/// else is prefixed with its table.
pub fn qualified_field(
    aliases: &AliasMap,
    left_table: &str,
    qualifier: Option<&str>,
    column: &str,
) -> String {
    let table = column_table(aliases, left_table, qualifier, column);
    if table == left_table {
        column.to_string()
    } else {
        format!("{table}.{column}")
    }
}

/// Narrow typed view over one token, with alias resolution
pub struct SqlIdent<'a> {
    token: &'a Token,
    aliases: &'a AliasMap,
}

impl<'a> SqlIdent<'a> {
    pub fn new(token: &'a Token, aliases: &'a AliasMap) -> Self {
        Self { token, aliases }
    }

    fn malformed(&self) -> TranspileError {
        TranspileError::MalformedIdentifier(self.token.value())
    }

    fn require_identifier(&self) -> TranspileResult<()> {
        if self.token.is_group(GroupKind::Identifier) {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }

    fn require_comparison(&self) -> TranspileResult<()> {
        if self.token.is_group(GroupKind::Comparison) {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }

    /// Table this identifier resolves to
    pub fn table(&self) -> TranspileResult<String> {
        self.require_identifier()?;
        let name = self.token.real_name().ok_or_else(|| self.malformed())?;
        Ok(resolve_table(
            self.aliases,
            self.token.parent_name(),
            name,
        ))
    }

    /// Column (real) name of this identifier
    pub fn column(&self) -> TranspileResult<String> {
        self.require_identifier()?;
        self.token
            .real_name()
            .map(String::from)
            .ok_or_else(|| self.malformed())
    }

    /// Alias of this identifier, if any
    pub fn alias(&self) -> TranspileResult<Option<&'a str>> {
        self.require_identifier()?;
        Ok(self.token.alias())
    }

    /// Sort direction: `+1` for ASC, `-1` for DESC
    pub fn order(&self) -> TranspileResult<i32> {
        self.require_identifier()?;
        let ordering = self.token.ordering().ok_or_else(|| self.malformed())?;
        if ordering.eq_ignore_ascii_case("ASC") {
            Ok(1)
        } else {
            Ok(-1)
        }
    }

    fn side(&self, left: bool) -> TranspileResult<SqlIdent<'a>> {
        self.require_comparison()?;
        let token = if left {
            self.token.comparison_left()
        } else {
            self.token.comparison_right()
        };
        Ok(SqlIdent::new(token.ok_or_else(|| self.malformed())?, self.aliases))
    }

    pub fn left_table(&self) -> TranspileResult<String> {
        self.side(true)?.table()
    }

    pub fn left_column(&self) -> TranspileResult<String> {
        self.side(true)?.column()
    }

    pub fn right_table(&self) -> TranspileResult<String> {
        self.side(false)?.table()
    }

    pub fn right_column(&self) -> TranspileResult<String> {
        self.side(false)?.column()
    }

    /// Column on the left-hand side of an assignment comparison
    pub fn lhs_column(&self) -> TranspileResult<String> {
        self.left_column()
    }

    /// Parameter index recovered from the right-hand side placeholder
    pub fn rhs_index(&self) -> TranspileResult<usize> {
        self.require_comparison()?;
        let right = self
            .token
            .comparison_right()
            .ok_or_else(|| self.malformed())?;
        let text = right
            .text()
            .filter(|_| right.is_placeholder())
            .ok_or_else(|| TranspileError::PlaceholderSyntax(right.value()))?;
        placeholder_index(text).ok_or_else(|| TranspileError::PlaceholderSyntax(text.to_string()))
    }

    /// Iterate a parenthesized value list
    ///
    /// Yields one parameter index per placeholder and `None` per NULL
    /// marker; anything else in the list is unsupported.
    pub fn in_values(&self) -> TranspileResult<Vec<Option<usize>>> {
        if !self.token.is_group(GroupKind::Parenthesis) {
            return Err(self.malformed());
        }
        let (_, first) = self.token.token_next(0).ok_or_else(|| self.malformed())?;

        if first.is_placeholder() {
            let text = first.text().ok_or_else(|| self.malformed())?;
            let index = placeholder_index(text)
                .ok_or_else(|| TranspileError::PlaceholderSyntax(text.to_string()))?;
            return Ok(vec![Some(index)]);
        }
        if first.is_keyword("NULL") {
            return Ok(vec![None]);
        }
        if first.is_group(GroupKind::IdentifierList) {
            let mut values = Vec::new();
            for item in first.identifiers() {
                if item.is_placeholder() {
                    let text = item.text().ok_or_else(|| self.malformed())?;
                    let index = placeholder_index(text)
                        .ok_or_else(|| TranspileError::PlaceholderSyntax(text.to_string()))?;
                    values.push(Some(index));
                } else if item.is_keyword("NULL") {
                    values.push(None);
                } else {
                    return Err(TranspileError::UnsupportedInList);
                }
            }
            return Ok(values);
        }
        Err(TranspileError::UnsupportedInList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql2mongo_tokenizer::parse_sql;

    fn first_identifier(sql: &str) -> Token {
        let statements = parse_sql(sql).unwrap();
        statements[0]
            .children()
            .iter()
            .find(|t| t.is_group(GroupKind::Identifier))
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_unqualified_table_falls_back_to_own_name() {
        let tok = first_identifier("SELECT \"a\" FROM \"t\"");
        let aliases = AliasMap::new();
        let ident = SqlIdent::new(&tok, &aliases);
        assert_eq!(ident.table().unwrap(), "a");
        assert_eq!(ident.column().unwrap(), "a");
    }

    #[test]
    fn test_qualifier_resolves_through_alias() {
        let tok = first_identifier("SELECT \"t1\".\"a\" FROM \"x\"");
        let mut aliases = AliasMap::new();
        aliases.insert(
            "t1",
            AliasTarget {
                qualifier: None,
                name: "table1".to_string(),
            },
        );
        let ident = SqlIdent::new(&tok, &aliases);
        assert_eq!(ident.table().unwrap(), "table1");
        assert_eq!(ident.column().unwrap(), "a");
    }

    #[test]
    fn test_unresolved_qualifier_is_literal() {
        let tok = first_identifier("SELECT \"u\".\"b\" FROM \"x\"");
        let aliases = AliasMap::new();
        let ident = SqlIdent::new(&tok, &aliases);
        assert_eq!(ident.table().unwrap(), "u");
    }

    #[test]
    fn test_wrong_shape_fails() {
        let statements = parse_sql("SELECT * FROM \"t\"").unwrap();
        let (_, star) = statements[0].token_next(0).unwrap();
        let aliases = AliasMap::new();
        let ident = SqlIdent::new(star, &aliases);
        assert!(matches!(
            ident.table(),
            Err(TranspileError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_qualified_field_rules() {
        let aliases = AliasMap::new();
        assert_eq!(qualified_field(&aliases, "t", Some("t"), "a"), "a");
        assert_eq!(qualified_field(&aliases, "t", Some("u"), "b"), "u.b");
        // an unqualified column belongs to the left table
        assert_eq!(qualified_field(&aliases, "t", None, "a"), "a");
    }

    #[test]
    fn test_qualified_field_through_alias() {
        let mut aliases = AliasMap::new();
        aliases.insert(
            "t1",
            AliasTarget {
                qualifier: None,
                name: "table1".to_string(),
            },
        );
        assert_eq!(qualified_field(&aliases, "table1", Some("t1"), "a"), "a");
        assert_eq!(qualified_field(&aliases, "other", Some("t1"), "a"), "table1.a");
    }

    #[test]
    fn test_self_referential_alias_does_not_loop() {
        let mut aliases = AliasMap::new();
        aliases.insert(
            "t",
            AliasTarget {
                qualifier: None,
                name: "t".to_string(),
            },
        );
        assert_eq!(resolve_table(&aliases, None, "t"), "t");
    }
}
