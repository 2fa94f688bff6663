// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! INSERT / UPDATE / DELETE drivers
//!
//! Each driver splits into a pure `prepare` step that lowers the
//! statement into a plan, and an `execute` step that runs the plan.
//! Write statements execute eagerly while the façade parses them, so
//! by the time the caller holds a result the mutation has happened.

use std::collections::VecDeque;

use bson::{Bson, Document, doc};
use mongodb::Database;
use mongodb::options::ReturnDocument;
use tracing::debug;

use sql2mongo_tokenizer::{GroupKind, Statement};
use sql2mongo_transpiler::{
    EmitContext, FromClause, QueryContext, SetClause, TranspileError, WhereClause,
};

use crate::error::EngineResult;
use crate::schema::{SCHEMA_COLLECTION, SchemaEntry};

/// Lowered form of an UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub collection: String,
    pub filter: Document,
    pub update: Document,
}

/// Executed UPDATE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDriver {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateDriver {
    /// Lower `UPDATE <tbl> SET <assignments> [WHERE …]`
    pub fn prepare(statement: &Statement, params: Vec<Bson>) -> EngineResult<UpdatePlan> {
        let mut ctx = QueryContext::new(params);
        let mut set_clause = None;
        let mut where_clause = None;

        let (mut token_id, mut token) = statement
            .first_token()
            .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;

        loop {
            let end_id;
            if token.is_dml("UPDATE") {
                let clause = FromClause::parse(statement, token_id, &mut ctx)?;
                end_id = clause.end_id;
            } else if token.is_keyword("SET") {
                let clause = SetClause::parse(statement, token_id, &ctx)?;
                end_id = clause.end_id;
                set_clause = Some(clause);
            } else if token.is_group(GroupKind::Where) {
                let clause = WhereClause::parse(statement, token_id, &mut ctx)?;
                end_id = clause.end_id;
                where_clause = Some(clause);
            } else {
                return Err(TranspileError::Unsupported(format!(
                    "UPDATE clause: {}",
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

        let set_clause = set_clause
            .ok_or_else(|| TranspileError::MalformedSql("UPDATE without SET".to_string()))?;
        let collection = ctx.require_left_table()?.to_string();
        let ectx = EmitContext {
            left_table: &collection,
            aliases: &ctx.aliases,
            nested_result: None,
        };
        let filter = match &where_clause {
            Some(clause) => clause.filter(&ectx)?,
            None => Document::new(),
        };
        let update = set_clause.update_doc(&ctx)?;
        Ok(UpdatePlan {
            collection,
            filter,
            update,
        })
    }

    pub async fn execute(
        statement: &Statement,
        params: Vec<Bson>,
        db: &Database,
    ) -> EngineResult<Self> {
        let plan = Self::prepare(statement, params)?;
        let result = db
            .collection::<Document>(&plan.collection)
            .update_many(plan.filter, plan.update)
            .await?;
        debug!(
            modified = result.modified_count,
            matched = result.matched_count,
            "update_many"
        );
        Ok(Self {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }
}

/// Lowered form of a DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    pub collection: String,
    pub filter: Document,
}

/// Executed DELETE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDriver {
    pub deleted: u64,
}

impl DeleteDriver {
    /// Lower `DELETE FROM <tbl> [WHERE …]`
    pub fn prepare(statement: &Statement, params: Vec<Bson>) -> EngineResult<DeletePlan> {
        let mut ctx = QueryContext::new(params);

        let (delete_id, delete_tok) = statement
            .first_token()
            .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;
        if !delete_tok.is_dml("DELETE") {
            return Err(TranspileError::MalformedSql("expected DELETE".to_string()).into());
        }
        let (from_id, from_tok) = statement
            .token_next(delete_id)
            .ok_or_else(|| TranspileError::MalformedSql("DELETE without FROM".to_string()))?;
        if !from_tok.is_keyword("FROM") {
            return Err(TranspileError::MalformedSql("DELETE without FROM".to_string()).into());
        }

        let from = FromClause::parse(statement, from_id, &mut ctx)?;
        let collection = from.table.clone();

        let mut filter = Document::new();
        if let Some((where_id, where_tok)) = statement.token_next(from.end_id) {
            if !where_tok.is_group(GroupKind::Where) {
                return Err(TranspileError::Unsupported(format!(
                    "DELETE clause: {}",
                    where_tok.value()
                ))
                .into());
            }
            let clause = WhereClause::parse(statement, where_id, &mut ctx)?;
            let ectx = EmitContext {
                left_table: &collection,
                aliases: &ctx.aliases,
                nested_result: None,
            };
            filter = clause.filter(&ectx)?;
        }

        Ok(DeletePlan { collection, filter })
    }

    pub async fn execute(
        statement: &Statement,
        params: Vec<Bson>,
        db: &Database,
    ) -> EngineResult<Self> {
        let plan = Self::prepare(statement, params)?;
        let result = db
            .collection::<Document>(&plan.collection)
            .delete_many(plan.filter)
            .await?;
        debug!(deleted = result.deleted_count, "delete_many");
        Ok(Self {
            deleted: result.deleted_count,
        })
    }
}

/// Lowered form of an INSERT statement, before auto-sequence fill-in
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub collection: String,
    pub document: Document,
}

/// Executed INSERT
#[derive(Debug, Clone, PartialEq)]
pub struct InsertDriver {
    pub last_row_id: Bson,
}

impl InsertDriver {
    /// Lower `INSERT INTO <tbl> (<cols>) VALUES (…)`
    ///
    /// Column values bind positionally: each declared column pops the
    /// next parameter, and leftover parameters are an error.
    pub fn prepare(statement: &Statement, params: Vec<Bson>) -> EngineResult<InsertPlan> {
        let (insert_id, insert_tok) = statement
            .first_token()
            .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;
        if !insert_tok.is_dml("INSERT") {
            return Err(TranspileError::MalformedSql("expected INSERT".to_string()).into());
        }
        let (into_id, into_tok) = statement
            .token_next(insert_id)
            .ok_or_else(|| TranspileError::MalformedSql("INSERT without INTO".to_string()))?;
        if !into_tok.is_keyword("INTO") {
            return Err(TranspileError::MalformedSql("INSERT without INTO".to_string()).into());
        }

        let (table_id, table_tok) = statement
            .token_next(into_id)
            .ok_or_else(|| TranspileError::MalformedSql("INSERT without a table".to_string()))?;
        let collection = table_tok
            .get_name()
            .ok_or_else(|| TranspileError::MalformedIdentifier(table_tok.value()))?
            .to_string();

        let (_, columns_tok) = statement
            .token_next(table_id)
            .filter(|(_, t)| t.is_group(GroupKind::Parenthesis))
            .ok_or_else(|| {
                TranspileError::MalformedSql("INSERT without a column list".to_string())
            })?;
        let (_, first) = columns_tok
            .token_next(0)
            .ok_or_else(|| TranspileError::MalformedSql("empty column list".to_string()))?;
        let column_tokens = if first.is_group(GroupKind::IdentifierList) {
            first.identifiers()
        } else if first.is_group(GroupKind::Identifier) {
            vec![first]
        } else {
            return Err(TranspileError::MalformedSql(format!(
                "INSERT column list: {}",
                first.value()
            ))
            .into());
        };

        let mut params = VecDeque::from(params);
        let mut document = Document::new();
        for column in column_tokens {
            let name = column
                .real_name()
                .ok_or_else(|| TranspileError::MalformedIdentifier(column.value()))?;
            let value = params.pop_front().ok_or_else(|| {
                TranspileError::MalformedSql("more columns than parameters".to_string())
            })?;
            document.insert(name, value);
        }
        if !params.is_empty() {
            return Err(
                TranspileError::MalformedSql("more parameters than columns".to_string()).into(),
            );
        }

        Ok(InsertPlan {
            collection,
            document,
        })
    }

    pub async fn execute(
        statement: &Statement,
        params: Vec<Bson>,
        db: &Database,
    ) -> EngineResult<Self> {
        let plan = Self::prepare(statement, params)?;

        // bump the auto sequence and stamp every auto field
        let auto_entry = db
            .collection::<Document>(SCHEMA_COLLECTION)
            .find_one_and_update(
                doc! { "name": plan.collection.as_str(), "auto": { "$exists": true } },
                doc! { "$inc": { "auto.seq": 1 } },
            )
            .return_document(ReturnDocument::After)
            .await?;

        let mut document = Document::new();
        let mut auto_row_id = None;
        if let Some(entry) = auto_entry {
            let entry: SchemaEntry = bson::from_document(entry)?;
            if let Some(auto) = entry.auto {
                for field in &auto.field_names {
                    document.insert(field, Bson::Int64(auto.seq));
                }
                auto_row_id = Some(Bson::Int64(auto.seq));
            }
        }
        document.extend(plan.document);

        let result = db
            .collection::<Document>(&plan.collection)
            .insert_one(document)
            .await?;
        debug!(inserted_id = %result.inserted_id, "insert_one");

        let last_row_id = auto_row_id.unwrap_or_else(|| match result.inserted_id {
            Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
            other => Bson::String(other.to_string()),
        });
        Ok(Self { last_row_id })
    }
}
