// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! DDL shims
//!
//! Only a narrow slice of DDL maps onto MongoDB: CREATE TABLE becomes
//! a collection plus unique indexes and auto-increment bookkeeping,
//! ALTER TABLE … ADD CONSTRAINT … UNIQUE becomes a named unique index,
//! DROP DATABASE drops the database. CREATE DATABASE is a no-op since
//! MongoDB creates databases on first write. Shapes outside these are
//! logged and ignored, except DROP which fails loudly.

use bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use tracing::debug;

use sql2mongo_tokenizer::{GroupKind, Statement};
use sql2mongo_transpiler::TranspileError;

use crate::error::EngineResult;
use crate::schema::SCHEMA_COLLECTION;

/// Name given to primary-key indexes
const PRIMARY_KEY_INDEX: &str = "__primary_key__";

async fn create_unique_index(
    db: &Database,
    collection: &str,
    keys: Document,
    name: Option<String>,
) -> EngineResult<()> {
    let options = match name {
        Some(name) => IndexOptions::builder().unique(true).name(name).build(),
        None => IndexOptions::builder().unique(true).build(),
    };
    let model = IndexModel::builder().keys(keys).options(options).build();
    db.collection::<Document>(collection)
        .create_index(model)
        .await?;
    Ok(())
}

/// Split the column-definition group into per-column declaration texts
///
/// Splits on top-level commas only, so type arguments like
/// `decimal(10,2)` stay inside their declaration.
fn column_declarations(body: &str) -> Vec<String> {
    let inner = body.trim();
    let inner = inner.strip_prefix('(').unwrap_or(inner);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    let mut declarations = Vec::new();
    let mut current = String::new();
    let mut depth = 0_i32;
    for ch in inner.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => declarations.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    declarations.push(current);
    declarations
}

/// First double-quoted name in a column declaration
fn quoted_field(declaration: &str) -> Option<String> {
    let start = declaration.find('"')?;
    let end = declaration[start + 1..].find('"')? + start + 1;
    Some(declaration[start + 1..end].to_string())
}

/// `CREATE TABLE <tbl> (<columns>)` / `CREATE DATABASE <name>`
pub async fn create(statement: &Statement, db: &Database) -> EngineResult<()> {
    let (create_id, _) = statement
        .first_token()
        .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;
    let Some((kind_id, kind_tok)) = statement.token_next(create_id) else {
        debug!(sql = %statement.value(), "unsupported CREATE shape ignored");
        return Ok(());
    };

    if kind_tok.is_keyword("DATABASE") {
        return Ok(());
    }
    if !kind_tok.is_keyword("TABLE") {
        debug!(sql = %statement.value(), "unsupported CREATE shape ignored");
        return Ok(());
    }

    let (table_id, table_tok) = statement
        .token_next(kind_id)
        .ok_or_else(|| TranspileError::MalformedSql("CREATE TABLE without a name".to_string()))?;
    let table = table_tok
        .real_name()
        .ok_or_else(|| TranspileError::MalformedIdentifier(table_tok.value()))?
        .to_string();
    db.create_collection(&table).await?;
    debug!(%table, "created collection");

    let Some((_, columns_tok)) = statement.token_next(table_id) else {
        return Ok(());
    };
    if !columns_tok.is_group(GroupKind::Parenthesis) {
        return Ok(());
    }

    let mut auto_fields = Vec::new();
    for declaration in column_declarations(&columns_tok.value()) {
        let Some(field) = quoted_field(&declaration) else {
            continue;
        };
        let mut keys = Document::new();
        keys.insert(&field, 1);
        if declaration.contains("PRIMARY KEY") {
            create_unique_index(db, &table, keys.clone(), Some(PRIMARY_KEY_INDEX.to_string()))
                .await?;
        }
        if declaration.contains("UNIQUE") {
            create_unique_index(db, &table, keys, None).await?;
        }
        if declaration.contains("AUTOINCREMENT") {
            auto_fields.push(field);
        }
    }

    if !auto_fields.is_empty() {
        db.collection::<Document>(SCHEMA_COLLECTION)
            .update_one(
                doc! { "name": table.as_str() },
                doc! {
                    "$set": { "auto.seq": 0 },
                    "$push": { "auto.field_names": { "$each": auto_fields } },
                },
            )
            .upsert(true)
            .await?;
    }
    Ok(())
}

/// `ALTER TABLE <tbl> ADD CONSTRAINT <name> UNIQUE (<fields>)`
pub async fn alter(statement: &Statement, db: &Database) -> EngineResult<()> {
    fn ignored(statement: &Statement) -> EngineResult<()> {
        debug!(sql = %statement.value(), "unsupported ALTER shape ignored");
        Ok(())
    }

    let Some((alter_id, _)) = statement.first_token() else {
        return ignored(statement);
    };
    let Some((table_kw_id, table_kw)) = statement.token_next(alter_id) else {
        return ignored(statement);
    };
    if !table_kw.is_keyword("TABLE") {
        return ignored(statement);
    }
    let Some((table_id, table_tok)) = statement.token_next(table_kw_id) else {
        return ignored(statement);
    };
    let Some(table) = table_tok.real_name() else {
        return ignored(statement);
    };
    let table = table.to_string();

    let Some((add_id, add_tok)) = statement.token_next(table_id) else {
        return ignored(statement);
    };
    if !add_tok.is_keyword("ADD") {
        return ignored(statement);
    }
    let Some((constraint_id, constraint_tok)) = statement.token_next(add_id) else {
        return ignored(statement);
    };
    if !constraint_tok.is_keyword("CONSTRAINT") {
        return ignored(statement);
    }
    let Some((name_id, name_tok)) = statement.token_next(constraint_id) else {
        return ignored(statement);
    };
    let Some(constraint_name) = name_tok.get_name() else {
        return ignored(statement);
    };
    let constraint_name = constraint_name.to_string();

    let Some((unique_id, unique_tok)) = statement.token_next(name_id) else {
        return ignored(statement);
    };
    if !unique_tok.is_keyword("UNIQUE") {
        return ignored(statement);
    }
    let Some((_, fields_tok)) = statement.token_next(unique_id) else {
        return ignored(statement);
    };
    if !fields_tok.is_group(GroupKind::Parenthesis) {
        return ignored(statement);
    }

    let Some((_, first)) = fields_tok.token_next(0) else {
        return ignored(statement);
    };
    let field_tokens = if first.is_group(GroupKind::IdentifierList) {
        first.identifiers()
    } else if first.is_group(GroupKind::Identifier) {
        vec![first]
    } else {
        return ignored(statement);
    };

    let mut keys = Document::new();
    for field in field_tokens {
        let Some(name) = field.real_name() else {
            return ignored(statement);
        };
        keys.insert(name, 1);
    }
    create_unique_index(db, &table, keys, Some(constraint_name)).await
}

/// `DROP DATABASE <name>`; anything else fails loudly
pub async fn drop(statement: &Statement, client: &Client) -> EngineResult<()> {
    let (drop_id, _) = statement
        .first_token()
        .ok_or_else(|| TranspileError::MalformedSql("empty statement".to_string()))?;
    let (kind_id, kind_tok) = statement
        .token_next(drop_id)
        .ok_or_else(|| TranspileError::MalformedSql(statement.value()))?;
    if !kind_tok.is_keyword("DATABASE") {
        return Err(TranspileError::MalformedSql(format!(
            "unsupported DROP: {}",
            statement.value()
        ))
        .into());
    }
    let (_, name_tok) = statement
        .token_next(kind_id)
        .ok_or_else(|| TranspileError::MalformedSql("DROP DATABASE without a name".to_string()))?;
    let name = name_tok
        .get_name()
        .ok_or_else(|| TranspileError::MalformedIdentifier(name_tok.value()))?;
    client.database(name).drop().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_declarations_split_on_top_level_commas() {
        let declarations = column_declarations(
            "(\"id\" int NOT NULL PRIMARY KEY AUTOINCREMENT, \"price\" decimal(10,2), \"name\" varchar(30) UNIQUE)",
        );
        assert_eq!(declarations.len(), 3);
        assert!(declarations[0].contains("PRIMARY KEY"));
        assert!(declarations[1].contains("decimal(10,2)"));
        assert!(declarations[2].contains("UNIQUE"));
    }

    #[test]
    fn test_quoted_field_extraction() {
        assert_eq!(
            quoted_field("\"id\" int NOT NULL PRIMARY KEY"),
            Some("id".to_string())
        );
        assert_eq!(quoted_field("CONSTRAINT something"), None);
    }
}
