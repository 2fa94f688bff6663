// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Clause converters
//!
//! Each converter parses one SQL clause from a known token offset,
//! records the index it stopped at (`end_id`) so the driver can resume
//! its scan, and carries typed clause state. Emission is split into a
//! find-fragment function and an aggregation-stage function; the driver
//! picks one based on the execution mode.

use bson::{Bson, Document, doc};

use sql2mongo_tokenizer::{GroupKind, Statement, Token};

use crate::context::{EmitContext, QueryContext};
use crate::error::{TranspileError, TranspileResult};
use crate::ident::{AliasMap, AliasTarget, SqlIdent, column_table, resolve_table};
use crate::predicate::PredicateTree;

/// One selected column of a projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedColumn {
    pub qualifier: Option<String>,
    pub column: String,
    pub alias: Option<String>,
}

impl SelectedColumn {
    /// Table this column belongs to at emission time
    pub fn table(&self, aliases: &AliasMap, left_table: &str) -> String {
        column_table(aliases, left_table, self.qualifier.as_deref(), &self.column)
    }
}

/// SELECT projection clause
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelect {
    pub select_all: bool,
    pub return_const: Option<Bson>,
    pub return_count: bool,
    pub columns: Vec<SelectedColumn>,
    pub end_id: usize,
}

impl ColumnSelect {
    pub fn parse(
        statement: &Statement,
        begin_id: usize,
        ctx: &mut QueryContext,
    ) -> TranspileResult<Self> {
        let (token_id, token) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("missing projection".to_string()))?;
        let mut this = Self {
            select_all: false,
            return_const: None,
            return_count: false,
            columns: Vec::new(),
            end_id: token_id,
        };

        if token.is_wildcard() {
            this.select_all = true;
        } else if token.is_group(GroupKind::Identifier) {
            this.identifier(token, ctx)?;
        } else if token.is_group(GroupKind::IdentifierList) {
            for item in token.identifiers() {
                this.identifier(item, ctx)?;
            }
        } else if token.is_group(GroupKind::Function) {
            this.function(token)?;
        } else if token.is_keyword("DISTINCT") {
            let (distinct_id, target) = statement.token_next(token_id).ok_or_else(|| {
                TranspileError::MalformedSql("DISTINCT without a column".to_string())
            })?;
            let column = target
                .real_name()
                .ok_or_else(|| TranspileError::MalformedIdentifier(target.value()))?;
            ctx.distinct = Some(column.to_string());
            this.end_id = distinct_id;
        } else {
            return Err(TranspileError::MalformedSql(format!(
                "unexpected projection: {}",
                token.value()
            )));
        }
        Ok(this)
    }

    fn identifier(&mut self, token: &Token, ctx: &mut QueryContext) -> TranspileResult<()> {
        match token.get(0) {
            Some(first) if first.is_group(GroupKind::Parenthesis) => {
                let (_, literal) = first.token_next(0).ok_or_else(|| {
                    TranspileError::MalformedSql("empty constant projection".to_string())
                })?;
                let text = literal.text().unwrap_or_default();
                let value: i64 = text.parse().map_err(|_| {
                    TranspileError::MalformedSql(format!("constant projection: {text}"))
                })?;
                self.return_const = Some(Bson::Int64(value));
            }
            Some(first) if first.is_group(GroupKind::Function) => {
                self.function(first)?;
            }
            _ => {
                let column = token
                    .real_name()
                    .ok_or_else(|| TranspileError::MalformedIdentifier(token.value()))?
                    .to_string();
                let qualifier = token.parent_name().map(String::from);
                let alias = token.alias().map(String::from);
                if let Some(alias) = &alias {
                    ctx.aliases.insert(
                        alias.clone(),
                        AliasTarget {
                            qualifier: qualifier.clone(),
                            name: column.clone(),
                        },
                    );
                }
                self.columns.push(SelectedColumn {
                    qualifier,
                    column,
                    alias,
                });
            }
        }
        Ok(())
    }

    fn function(&mut self, token: &Token) -> TranspileResult<()> {
        let name = token.get(0).and_then(Token::text).unwrap_or_default();
        if !name.eq_ignore_ascii_case("COUNT") {
            return Err(TranspileError::Unsupported(format!("function {name}")));
        }
        let counts_all = token
            .get(1)
            .and_then(|paren| paren.token_next(0))
            .is_some_and(|(_, arg)| arg.is_wildcard());
        if !counts_all {
            return Err(TranspileError::Unsupported(
                "COUNT of anything but *".to_string(),
            ));
        }
        self.return_count = true;
        Ok(())
    }

    /// Find-mode projection: the list of column names
    pub fn projection(&self, ctx: &QueryContext) -> Vec<String> {
        if let Some(distinct) = &ctx.distinct {
            return vec![distinct.clone()];
        }
        self.columns.iter().map(|c| c.column.clone()).collect()
    }

    /// Aggregation-mode `$project` stage
    pub fn project_stage(&self, ectx: &EmitContext<'_>) -> Document {
        let mut project = Document::new();
        for column in &self.columns {
            project.insert(
                ectx.field(column.qualifier.as_deref(), &column.column),
                true,
            );
        }
        doc! { "$project": project }
    }
}

/// FROM clause: records the left table and its alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromClause {
    pub table: String,
    pub end_id: usize,
}

impl FromClause {
    pub fn parse(
        statement: &Statement,
        begin_id: usize,
        ctx: &mut QueryContext,
    ) -> TranspileResult<Self> {
        let (end_id, token) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("missing table name".to_string()))?;
        let name = token
            .real_name()
            .ok_or_else(|| TranspileError::MalformedIdentifier(token.value()))?
            .to_string();
        let qualifier = token.parent_name().map(String::from);
        let table = SqlIdent::new(token, &ctx.aliases).table()?;
        if let Some(alias) = token.alias() {
            ctx.aliases.insert(
                alias,
                AliasTarget {
                    qualifier,
                    name,
                },
            );
        }
        ctx.left_table = Some(table.clone());
        Ok(Self { table, end_id })
    }
}

/// WHERE clause: owns the evaluated predicate tree
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub tree: PredicateTree,
    pub end_id: usize,
}

impl WhereClause {
    pub fn parse(
        statement: &Statement,
        begin_id: usize,
        ctx: &mut QueryContext,
    ) -> TranspileResult<Self> {
        let token = statement
            .get(begin_id)
            .filter(|t| t.is_group(GroupKind::Where))
            .ok_or_else(|| TranspileError::MalformedSql("missing WHERE clause".to_string()))?;
        let tree = PredicateTree::build(token, ctx)?;
        Ok(Self {
            tree,
            end_id: begin_id,
        })
    }

    /// Find-mode filter document
    pub fn filter(&self, ectx: &EmitContext<'_>) -> TranspileResult<Document> {
        self.tree.emit(ectx)
    }

    /// Aggregation-mode `$match` stage
    pub fn match_stage(&self, ectx: &EmitContext<'_>) -> TranspileResult<Document> {
        Ok(doc! { "$match": self.filter(ectx)? })
    }
}

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Outer,
}

/// `JOIN <table> ON <cmp>`, aligned so `left` is the lookup source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub left_table: String,
    pub right_table: String,
    pub left_column: String,
    pub right_column: String,
    pub end_id: usize,
}

impl JoinClause {
    pub fn parse(
        kind: JoinKind,
        statement: &Statement,
        begin_id: usize,
        ctx: &QueryContext,
    ) -> TranspileResult<Self> {
        let (table_id, table_tok) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("JOIN without a table".to_string()))?;
        let right_table = SqlIdent::new(table_tok, &ctx.aliases).table()?;

        let (on_id, on_tok) = statement
            .token_next(table_id)
            .ok_or_else(|| TranspileError::MalformedSql("JOIN without ON".to_string()))?;
        if !on_tok.is_keyword("ON") {
            return Err(TranspileError::MalformedSql("JOIN without ON".to_string()));
        }

        let (cmp_id, mut cmp_tok) = statement
            .token_next(on_id)
            .ok_or_else(|| TranspileError::MalformedSql("ON without a condition".to_string()))?;
        if cmp_tok.is_group(GroupKind::Parenthesis) {
            cmp_tok = cmp_tok
                .token_next(0)
                .map(|(_, t)| t)
                .ok_or_else(|| TranspileError::MalformedSql("empty ON condition".to_string()))?;
        }

        let condition = SqlIdent::new(cmp_tok, &ctx.aliases);
        let (left_table, left_column, right_column) = if right_table == condition.right_table()? {
            (
                condition.left_table()?,
                condition.left_column()?,
                condition.right_column()?,
            )
        } else {
            (
                condition.right_table()?,
                condition.right_column()?,
                condition.left_column()?,
            )
        };

        Ok(Self {
            kind,
            left_table,
            right_table,
            left_column,
            right_column,
            end_id: cmp_id,
        })
    }

    fn lookup(&self, ectx: &EmitContext<'_>) -> Document {
        let local_field = if self.left_table == ectx.left_table {
            self.left_column.clone()
        } else {
            format!("{}.{}", self.left_table, self.left_column)
        };
        doc! {
            "$lookup": {
                "from": self.right_table.as_str(),
                "localField": local_field,
                "foreignField": self.right_column.as_str(),
                "as": self.right_table.as_str(),
            }
        }
    }

    /// Pipeline stages realizing this join
    pub fn stages(&self, ectx: &EmitContext<'_>) -> Vec<Document> {
        match self.kind {
            JoinKind::Inner => {
                let mut guard = Document::new();
                guard.insert(
                    &self.left_column,
                    doc! { "$ne": Bson::Null, "$exists": true },
                );
                vec![
                    doc! { "$match": guard },
                    self.lookup(ectx),
                    doc! { "$unwind": format!("${}", self.right_table) },
                ]
            }
            JoinKind::Outer => vec![
                self.lookup(ectx),
                doc! {
                    "$unwind": {
                        "path": format!("${}", self.right_table),
                        "preserveNullAndEmptyArrays": true,
                    }
                },
            ],
        }
    }
}

/// LIMIT clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitClause {
    pub limit: i64,
    pub end_id: usize,
}

impl LimitClause {
    pub fn parse(statement: &Statement, begin_id: usize) -> TranspileResult<Self> {
        let (end_id, token) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("LIMIT without a count".to_string()))?;
        let text = token.text().unwrap_or_default();
        let limit = text
            .parse()
            .map_err(|_| TranspileError::MalformedSql(format!("LIMIT count: {text}")))?;
        Ok(Self { limit, end_id })
    }

    /// Aggregation-mode `$limit` stage
    pub fn limit_stage(&self) -> Document {
        doc! { "$limit": self.limit }
    }
}

/// One ORDER BY column with its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub qualifier: Option<String>,
    pub column: String,
    /// `+1` ascending, `-1` descending
    pub direction: i32,
}

/// ORDER BY clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub items: Vec<OrderItem>,
    pub end_id: usize,
}

impl OrderClause {
    pub fn parse(
        statement: &Statement,
        begin_id: usize,
        ctx: &QueryContext,
    ) -> TranspileResult<Self> {
        let (by_id, by_tok) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("ORDER without BY".to_string()))?;
        if !by_tok.is_keyword("BY") {
            return Err(TranspileError::MalformedSql("ORDER without BY".to_string()));
        }

        let (end_id, token) = statement
            .token_next(by_id)
            .ok_or_else(|| TranspileError::MalformedSql("ORDER BY without columns".to_string()))?;
        let mut items = Vec::new();
        if token.is_group(GroupKind::Identifier) {
            items.push(Self::item(token, ctx)?);
        } else if token.is_group(GroupKind::IdentifierList) {
            for entry in token.identifiers() {
                items.push(Self::item(entry, ctx)?);
            }
        } else {
            return Err(TranspileError::MalformedSql(format!(
                "ORDER BY: {}",
                token.value()
            )));
        }
        Ok(Self { items, end_id })
    }

    fn item(token: &Token, ctx: &QueryContext) -> TranspileResult<OrderItem> {
        let direction = SqlIdent::new(token, &ctx.aliases).order()?;
        Ok(OrderItem {
            qualifier: token.parent_name().map(String::from),
            column: token
                .real_name()
                .ok_or_else(|| TranspileError::MalformedIdentifier(token.value()))?
                .to_string(),
            direction,
        })
    }

    /// Find-mode sort specification
    ///
    /// Keys follow the resolver's table rule, whose own-name fallback
    /// makes the key the column name for unqualified order columns.
    pub fn sort_spec(&self, ectx: &EmitContext<'_>) -> Vec<(String, i32)> {
        self.items
            .iter()
            .map(|item| {
                (
                    resolve_table(ectx.aliases, item.qualifier.as_deref(), &item.column),
                    item.direction,
                )
            })
            .collect()
    }

    /// Aggregation-mode `$sort` stage; key order is item order
    pub fn sort_stage(&self, ectx: &EmitContext<'_>) -> Document {
        let mut sort = Document::new();
        for item in &self.items {
            sort.insert(
                ectx.field(item.qualifier.as_deref(), &item.column),
                item.direction,
            );
        }
        doc! { "$sort": sort }
    }
}

/// SET clause of an UPDATE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetClause {
    /// `(column, parameter index)` pairs in declaration order
    pub assignments: Vec<(String, usize)>,
    pub end_id: usize,
}

impl SetClause {
    pub fn parse(
        statement: &Statement,
        begin_id: usize,
        ctx: &QueryContext,
    ) -> TranspileResult<Self> {
        let (end_id, token) = statement
            .token_next(begin_id)
            .ok_or_else(|| TranspileError::MalformedSql("SET without assignments".to_string()))?;
        let mut assignments = Vec::new();
        if token.is_group(GroupKind::Comparison) {
            assignments.push(Self::assignment(token, ctx)?);
        } else if token.is_group(GroupKind::IdentifierList) {
            for entry in token.identifiers() {
                assignments.push(Self::assignment(entry, ctx)?);
            }
        } else {
            return Err(TranspileError::MalformedSql(format!(
                "SET expects assignments, found {}",
                token.value()
            )));
        }
        Ok(Self {
            assignments,
            end_id,
        })
    }

    fn assignment(token: &Token, ctx: &QueryContext) -> TranspileResult<(String, usize)> {
        let ident = SqlIdent::new(token, &ctx.aliases);
        Ok((ident.lhs_column()?, ident.rhs_index()?))
    }

    /// The `$set` update document
    pub fn update_doc(&self, ctx: &QueryContext) -> TranspileResult<Document> {
        let mut set = Document::new();
        for (column, index) in &self.assignments {
            set.insert(column, ctx.param(*index)?.clone());
        }
        Ok(doc! { "$set": set })
    }
}
