// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! SELECT driver
//!
//! Parsing walks the statement's clause keywords and materializes one
//! converter per clause. Planning is pure: [`SelectDriver::plan`]
//! lowers the converters into either a `find` description or an
//! aggregation pipeline, so the whole lowering is testable without a
//! server. Execution opens the cursor lazily on the first `count` or
//! row demand.
//!
//! A SELECT runs as a pipeline exactly when it has joins; DISTINCT is
//! only legal in find mode. A recorded `IN (SELECT …)` subquery is
//! drained to completion before the outer cursor opens, and its first
//! column becomes the membership list.

use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::{Cursor, Database};
use tracing::debug;

use sql2mongo_tokenizer::{GroupKind, Statement};
use sql2mongo_transpiler::{
    ColumnSelect, EmitContext, FromClause, JoinClause, JoinKind, LimitClause, OrderClause,
    QueryContext, TranspileError, WhereClause,
};

use crate::error::EngineResult;
use crate::result::Row;

/// Pure description of the driver call a SELECT lowers to
#[derive(Debug, Clone, PartialEq)]
pub enum SelectPlan {
    Find {
        filter: Document,
        projection: Option<Document>,
        sort: Option<Document>,
        limit: Option<i64>,
        distinct: Option<String>,
    },
    Aggregate {
        pipeline: Vec<Document>,
    },
}

/// Live row source once the cursor is open
enum RowSource {
    Cursor { cursor: Cursor<Document>, align: bool },
    Buffered(std::vec::IntoIter<Document>),
    Distinct(std::vec::IntoIter<Bson>),
    ConstReplay { remaining: u64, value: Bson },
    CountOnce { done: bool, value: u64 },
}

/// Driver for one SELECT statement
pub struct SelectDriver {
    ctx: QueryContext,
    columns: ColumnSelect,
    where_clause: Option<WhereClause>,
    joins: Vec<JoinClause>,
    order: Option<OrderClause>,
    limit: Option<LimitClause>,
    nested_result: Option<Vec<Bson>>,
    source: Option<RowSource>,
    cached_count: Option<u64>,
}

impl SelectDriver {
    /// Walk the statement and parse every clause
    pub fn parse(statement: &Statement, params: Vec<Bson>) -> EngineResult<Self> {
        let mut ctx = QueryContext::new(params);
        let mut columns = None;
        let mut where_clause = None;
        let mut joins = Vec::new();
        let mut order = None;
        let mut limit = None;

        let (mut token_id, mut token) = statement
            .first_token()
            .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;

        loop {
            let end_id;
            if token.is_dml("SELECT") {
                let clause = ColumnSelect::parse(statement, token_id, &mut ctx)?;
                end_id = clause.end_id;
                columns = Some(clause);
            } else if token.is_keyword("FROM") {
                let clause = FromClause::parse(statement, token_id, &mut ctx)?;
                end_id = clause.end_id;
            } else if token.is_keyword("LIMIT") {
                let clause = LimitClause::parse(statement, token_id)?;
                end_id = clause.end_id;
                limit = Some(clause);
            } else if token.is_keyword("ORDER") {
                let clause = OrderClause::parse(statement, token_id, &ctx)?;
                end_id = clause.end_id;
                order = Some(clause);
            } else if token.is_keyword("INNER JOIN") {
                let clause = JoinClause::parse(JoinKind::Inner, statement, token_id, &ctx)?;
                end_id = clause.end_id;
                joins.push(clause);
            } else if token.is_keyword("LEFT OUTER JOIN") {
                let clause = JoinClause::parse(JoinKind::Outer, statement, token_id, &ctx)?;
                end_id = clause.end_id;
                joins.push(clause);
            } else if token.is_group(GroupKind::Where) {
                let clause = WhereClause::parse(statement, token_id, &mut ctx)?;
                end_id = clause.end_id;
                where_clause = Some(clause);
            } else {
                return Err(TranspileError::Unsupported(format!(
                    "SELECT clause: {}",
                    token.value()
                ))
                .into());
            }

            match statement.token_next(end_id) {
                Some((next_id, next)) => {
                    token_id = next_id;
                    token = next;
                }
                None => break,
            }
        }

        let columns = columns
            .ok_or_else(|| TranspileError::MalformedSql("missing SELECT clause".to_string()))?;
        Ok(Self {
            ctx,
            columns,
            where_clause,
            joins,
            order,
            limit,
            nested_result: None,
            source: None,
            cached_count: None,
        })
    }

    /// Projection shape of this statement, for nested-subquery checks
    pub fn is_aggregate_projection(&self) -> bool {
        self.columns.return_count || self.columns.return_const.is_some()
    }

    /// Lower the parsed clauses into a driver-call description
    pub fn plan(&self) -> EngineResult<SelectPlan> {
        let left_table = self.ctx.require_left_table()?;
        let ectx = EmitContext {
            left_table,
            aliases: &self.ctx.aliases,
            nested_result: self.nested_result.as_deref(),
        };

        if !self.joins.is_empty() {
            if self.ctx.distinct.is_some() {
                return Err(TranspileError::Unsupported(
                    "DISTINCT is only supported without joins".to_string(),
                )
                .into());
            }
            let mut pipeline = Vec::new();
            for join in &self.joins {
                pipeline.extend(join.stages(&ectx));
            }
            if let Some(where_clause) = &self.where_clause {
                pipeline.push(where_clause.match_stage(&ectx)?);
            }
            if let Some(order) = &self.order {
                pipeline.push(order.sort_stage(&ectx));
            }
            if let Some(limit) = &self.limit {
                pipeline.push(limit.limit_stage());
            }
            if !self.columns.columns.is_empty() {
                pipeline.push(self.columns.project_stage(&ectx));
            }
            return Ok(SelectPlan::Aggregate { pipeline });
        }

        let filter = match &self.where_clause {
            Some(where_clause) => where_clause.filter(&ectx)?,
            None => Document::new(),
        };
        let projection = {
            let columns = self.columns.projection(&self.ctx);
            if columns.is_empty() {
                None
            } else {
                let mut doc = Document::new();
                for column in columns {
                    doc.insert(column, true);
                }
                Some(doc)
            }
        };
        let sort = self.order.as_ref().map(|order| {
            let mut doc = Document::new();
            for (key, direction) in order.sort_spec(&ectx) {
                doc.insert(key, direction);
            }
            doc
        });

        Ok(SelectPlan::Find {
            filter,
            projection,
            sort,
            limit: self.limit.as_ref().map(|l| l.limit),
            distinct: self.ctx.distinct.clone(),
        })
    }

    /// Drain the recorded nested subquery and keep its first column
    async fn ensure_nested(&mut self, db: &Database) -> EngineResult<()> {
        if self.nested_result.is_some() {
            return Ok(());
        }
        let Some(statement) = self.ctx.nested.clone() else {
            return Ok(());
        };

        let nested = SelectDriver::parse(&statement, self.ctx.params.clone())?;
        if nested.ctx.nested.is_some() {
            return Err(TranspileError::Unsupported(
                "multi-level nested subqueries".to_string(),
            )
            .into());
        }
        if nested.is_aggregate_projection() {
            return Err(TranspileError::Unsupported(
                "aggregate projection in a nested subquery".to_string(),
            )
            .into());
        }

        let left_table = nested.ctx.require_left_table()?.to_string();
        let mut values = Vec::new();
        match nested.plan()? {
            SelectPlan::Find {
                filter,
                projection,
                sort,
                limit,
                distinct,
            } => {
                if let Some(column) = distinct {
                    values = db
                        .collection::<Document>(&left_table)
                        .distinct(column, filter)
                        .await?;
                } else {
                    let collection = db.collection::<Document>(&left_table);
                    let mut find = collection.find(filter);
                    if let Some(projection) = projection {
                        find = find.projection(projection);
                    }
                    if let Some(sort) = sort {
                        find = find.sort(sort);
                    }
                    if let Some(limit) = limit {
                        find = find.limit(limit);
                    }
                    let mut cursor = find.await?;
                    while let Some(doc) = cursor.try_next().await? {
                        let row = nested.project_find_doc(doc);
                        values.push(row.into_iter().next().unwrap_or(Bson::Null));
                    }
                }
            }
            SelectPlan::Aggregate { pipeline } => {
                let mut cursor = db
                    .collection::<Document>(&left_table)
                    .aggregate(pipeline)
                    .await?;
                while let Some(doc) = cursor.try_next().await? {
                    let row = nested.align_doc(doc);
                    values.push(row.into_iter().next().unwrap_or(Bson::Null));
                }
            }
        }

        debug!(count = values.len(), "resolved nested subquery");
        self.nested_result = Some(values);
        Ok(())
    }

    /// Number of rows this statement produces
    pub async fn count(&mut self, db: &Database) -> EngineResult<u64> {
        if let Some(count) = self.cached_count {
            return Ok(count);
        }
        self.ensure_nested(db).await?;
        let left_table = self.ctx.require_left_table()?.to_string();

        let count = match self.plan()? {
            SelectPlan::Find {
                filter,
                limit,
                distinct,
                ..
            } => {
                if let Some(column) = distinct {
                    let values = db
                        .collection::<Document>(&left_table)
                        .distinct(column, filter)
                        .await?;
                    let count = values.len() as u64;
                    if self.source.is_none() {
                        self.source = Some(RowSource::Distinct(values.into_iter()));
                    }
                    count
                } else {
                    let collection = db.collection::<Document>(&left_table);
                    let mut count = collection.count_documents(filter);
                    if let Some(limit) = limit {
                        if limit > 0 {
                            count = count.limit(limit as u64);
                        }
                    }
                    count.await?
                }
            }
            SelectPlan::Aggregate { pipeline } => {
                // materialize, and keep the rows for iteration
                let mut cursor = db
                    .collection::<Document>(&left_table)
                    .aggregate(pipeline)
                    .await?;
                let mut docs = Vec::new();
                while let Some(doc) = cursor.try_next().await? {
                    docs.push(doc);
                }
                let count = docs.len() as u64;
                if self.source.is_none() {
                    self.source = Some(RowSource::Buffered(docs.into_iter()));
                }
                count
            }
        };

        self.cached_count = Some(count);
        Ok(count)
    }

    async fn open(&mut self, db: &Database) -> EngineResult<()> {
        if self.source.is_some() {
            return Ok(());
        }

        if let Some(value) = self.columns.return_const.clone() {
            let remaining = self.count(db).await?;
            self.source = Some(RowSource::ConstReplay { remaining, value });
            return Ok(());
        }
        if self.columns.return_count {
            let value = self.count(db).await?;
            self.source = Some(RowSource::CountOnce { done: false, value });
            return Ok(());
        }

        self.ensure_nested(db).await?;
        let left_table = self.ctx.require_left_table()?.to_string();
        match self.plan()? {
            SelectPlan::Find {
                filter,
                projection,
                sort,
                limit,
                distinct,
            } => {
                if let Some(column) = distinct {
                    let values = db
                        .collection::<Document>(&left_table)
                        .distinct(column, filter)
                        .await?;
                    self.source = Some(RowSource::Distinct(values.into_iter()));
                } else {
                    let collection = db.collection::<Document>(&left_table);
                    let mut find = collection.find(filter);
                    if let Some(projection) = projection {
                        find = find.projection(projection);
                    }
                    if let Some(sort) = sort {
                        find = find.sort(sort);
                    }
                    if let Some(limit) = limit {
                        find = find.limit(limit);
                    }
                    let cursor = find.await?;
                    self.source = Some(RowSource::Cursor {
                        cursor,
                        align: false,
                    });
                }
            }
            SelectPlan::Aggregate { pipeline } => {
                let cursor = db
                    .collection::<Document>(&left_table)
                    .aggregate(pipeline)
                    .await?;
                self.source = Some(RowSource::Cursor {
                    cursor,
                    align: true,
                });
            }
        }
        Ok(())
    }

    /// Pull the next row, opening the cursor on first demand
    pub async fn next_row(&mut self, db: &Database) -> EngineResult<Option<Row>> {
        if self.source.is_none() {
            self.open(db).await?;
        }

        let (doc, align) = {
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            match source {
                RowSource::ConstReplay { remaining, value } => {
                    return if *remaining == 0 {
                        Ok(None)
                    } else {
                        *remaining -= 1;
                        Ok(Some(vec![value.clone()]))
                    };
                }
                RowSource::CountOnce { done, value } => {
                    return if *done {
                        Ok(None)
                    } else {
                        *done = true;
                        Ok(Some(vec![Bson::Int64(*value as i64)]))
                    };
                }
                RowSource::Distinct(values) => {
                    return Ok(values.next().map(|value| vec![value]));
                }
                RowSource::Buffered(docs) => match docs.next() {
                    Some(doc) => (doc, true),
                    None => return Ok(None),
                },
                RowSource::Cursor { cursor, align } => {
                    let align = *align;
                    match cursor.try_next().await? {
                        Some(doc) => (doc, align),
                        None => return Ok(None),
                    }
                }
            }
        };

        Ok(Some(if align {
            self.align_doc(doc)
        } else {
            self.project_find_doc(doc)
        }))
    }

    /// Drop the open cursor, if any
    pub fn close(&mut self) {
        self.source = None;
    }

    /// Row extraction for find-mode documents
    ///
    /// When the document carries exactly the projected fields plus
    /// `_id`, values are yielded in document order; otherwise the row
    /// is aligned against the projection list.
    fn project_find_doc(&self, mut doc: Document) -> Row {
        if self.columns.select_all || doc.len() == self.columns.columns.len() + 1 {
            doc.remove("_id");
            doc.into_iter().map(|(_, value)| value).collect()
        } else {
            self.align_doc(doc)
        }
    }

    /// Align a document against the projection, preserving arity
    ///
    /// Missing keys yield null. That silence is deliberate; the debug
    /// log is the only trace.
    fn align_doc(&self, doc: Document) -> Row {
        let left_table = self.ctx.left_table.as_deref().unwrap_or_default();
        let mut row = Vec::with_capacity(self.columns.columns.len());
        for column in &self.columns.columns {
            let table = column.table(&self.ctx.aliases, left_table);
            let value = if table == left_table {
                doc.get(&column.column).cloned()
            } else {
                doc.get_document(&table)
                    .ok()
                    .and_then(|sub| sub.get(&column.column).cloned())
            };
            match value {
                Some(value) => row.push(value),
                None => {
                    debug!(column = %column.column, "field missing from result document, yielding null");
                    row.push(Bson::Null);
                }
            }
        }
        row
    }
}

impl std::fmt::Debug for SelectDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectDriver")
            .field("left_table", &self.ctx.left_table)
            .field("joins", &self.joins.len())
            .field("has_where", &self.where_clause.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use sql2mongo_test_utils::{int_params, parse_one};

    fn driver(sql: &str, params: Vec<Bson>) -> SelectDriver {
        SelectDriver::parse(&parse_one(sql), params).unwrap()
    }

    #[test]
    fn test_pipeline_mode_iff_joins() {
        let find = driver("SELECT \"a\" FROM \"t\"", Vec::new());
        assert!(matches!(find.plan().unwrap(), SelectPlan::Find { .. }));

        let agg = driver(
            "SELECT \"t\".\"a\" FROM \"t\" INNER JOIN \"u\" ON \"t\".\"k\" = \"u\".\"k\"",
            Vec::new(),
        );
        assert!(matches!(agg.plan().unwrap(), SelectPlan::Aggregate { .. }));
    }

    #[test]
    fn test_unknown_clause_rejected() {
        let err = SelectDriver::parse(
            &parse_one("SELECT \"a\" FROM \"t\" GROUP BY \"a\""),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transpile(TranspileError::Unsupported(_))
        ));
    }

    #[test]
    fn test_align_doc_preserves_arity() {
        let d = driver("SELECT \"a\", \"b\" FROM \"t\" WHERE \"x\" = %s", int_params(&[1]));
        let row = d.align_doc(bson::doc! { "a": 10 });
        assert_eq!(row, vec![Bson::Int32(10), Bson::Null]);
    }
}
