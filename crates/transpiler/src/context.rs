// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Shared per-query state
//!
//! [`QueryContext`] is the mutable state a statement accumulates while
//! its clauses parse: the bound parameter table, the left table set by
//! FROM, the alias scope, the DISTINCT target and at most one recorded
//! nested subquery. [`EmitContext`] is the read-only view emission
//! runs against once parsing is complete.

use bson::Bson;
use sql2mongo_tokenizer::Statement;

use crate::error::{TranspileError, TranspileResult};
use crate::ident::{AliasMap, qualified_field};

/// Mutable state threaded through clause parsing
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Bound parameters, indexed by placeholder number
    pub params: Vec<Bson>,
    /// Collection the statement operates on, set by FROM
    pub left_table: Option<String>,
    /// Alias scope for this query
    pub aliases: AliasMap,
    /// DISTINCT target column, if any
    pub distinct: Option<String>,
    /// Nested `IN (SELECT …)` statement, at most one per query
    pub nested: Option<Statement>,
}

impl QueryContext {
    pub fn new(params: Vec<Bson>) -> Self {
        Self {
            params,
            left_table: None,
            aliases: AliasMap::new(),
            distinct: None,
            nested: None,
        }
    }

    /// Left table, failing when FROM has not parsed yet
    pub fn require_left_table(&self) -> TranspileResult<&str> {
        self.left_table
            .as_deref()
            .ok_or_else(|| TranspileError::MalformedSql("statement has no FROM table".to_string()))
    }

    /// Bounds-checked parameter lookup
    pub fn param(&self, index: usize) -> TranspileResult<&Bson> {
        self.params
            .get(index)
            .ok_or(TranspileError::ParameterIndex {
                index,
                available: self.params.len(),
            })
    }

    /// Record the nested subquery; a second one is unsupported
    pub fn record_nested(&mut self, statement: Statement) -> TranspileResult<()> {
        if self.nested.is_some() {
            return Err(TranspileError::Unsupported(
                "multiple nested subqueries".to_string(),
            ));
        }
        self.nested = Some(statement);
        Ok(())
    }
}

/// Read-only view for document emission
pub struct EmitContext<'a> {
    pub left_table: &'a str,
    pub aliases: &'a AliasMap,
    /// First-column values of the resolved nested subquery
    pub nested_result: Option<&'a [Bson]>,
}

impl EmitContext<'_> {
    /// Emitted key for a column reference
    pub fn field(&self, qualifier: Option<&str>, column: &str) -> String {
        qualified_field(self.aliases, self.left_table, qualifier, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql2mongo_tokenizer::parse_sql;

    #[test]
    fn test_param_bounds_check() {
        let ctx = QueryContext::new(vec![Bson::Int32(1)]);
        assert_eq!(ctx.param(0).unwrap(), &Bson::Int32(1));
        assert_eq!(
            ctx.param(1).unwrap_err(),
            TranspileError::ParameterIndex {
                index: 1,
                available: 1
            }
        );
    }

    #[test]
    fn test_single_nested_query() {
        let mut ctx = QueryContext::new(Vec::new());
        let stmt = parse_sql("SELECT \"y\" FROM \"u\"").unwrap().remove(0);
        ctx.record_nested(stmt.clone()).unwrap();
        assert!(matches!(
            ctx.record_nested(stmt),
            Err(TranspileError::Unsupported(_))
        ));
    }
}
