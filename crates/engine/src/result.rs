// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Result façade
//!
//! [`ResultSet`] binds placeholders, parses the single statement,
//! dispatches to the matching driver and presents the relational
//! client surface. Errors are logged with the offending SQL before
//! they propagate; a SELECT that is never consumed never opens a
//! cursor.

use bson::Bson;
use mongodb::{Client, Database};
use tracing::{debug, error};

use sql2mongo_tokenizer::{StatementKind, TokenizeError, number_placeholders, parse_sql};

use crate::ddl;
use crate::error::{EngineError, EngineResult};
use crate::select::SelectDriver;
use crate::write::{DeleteDriver, InsertDriver, UpdateDriver};

/// One result row; arity matches the statement's projection
pub type Row = Vec<Bson>;

enum Driver {
    Select(Box<SelectDriver>),
    Update(UpdateDriver),
    Insert(InsertDriver),
    Delete(DeleteDriver),
    Ddl,
}

/// Executed (or lazily pending) statement result
pub struct ResultSet {
    db: Database,
    sql: String,
    driver: Driver,
    last_row_id: Option<Bson>,
}

impl ResultSet {
    /// Bind, parse and dispatch one SQL statement
    pub(crate) async fn new(
        client: &Client,
        db: Database,
        sql: &str,
        params: Vec<Bson>,
    ) -> EngineResult<Self> {
        let bound = number_placeholders(sql);
        debug!(sql = %bound, params = ?params, "parsing statement");
        let result = Self::build(client, db, &bound, params).await;
        if let Err(err) = &result {
            error!(sql = %bound, %err, "failed SQL");
        }
        result
    }

    async fn build(
        client: &Client,
        db: Database,
        bound: &str,
        params: Vec<Bson>,
    ) -> EngineResult<Self> {
        let mut statements = parse_sql(bound)?;
        if statements.len() > 1 {
            return Err(EngineError::MultipleStatements);
        }
        let statement = statements
            .pop()
            .ok_or(EngineError::Tokenize(TokenizeError::EmptyStatement))?;

        let mut last_row_id = None;
        let driver = match statement.kind() {
            StatementKind::Select => {
                Driver::Select(Box::new(SelectDriver::parse(&statement, params)?))
            }
            StatementKind::Insert => {
                let driver = InsertDriver::execute(&statement, params, &db).await?;
                last_row_id = Some(driver.last_row_id.clone());
                Driver::Insert(driver)
            }
            StatementKind::Update => {
                Driver::Update(UpdateDriver::execute(&statement, params, &db).await?)
            }
            StatementKind::Delete => {
                Driver::Delete(DeleteDriver::execute(&statement, params, &db).await?)
            }
            StatementKind::Create => {
                ddl::create(&statement, &db).await?;
                Driver::Ddl
            }
            StatementKind::Alter => {
                ddl::alter(&statement, &db).await?;
                Driver::Ddl
            }
            StatementKind::Drop => {
                ddl::drop(&statement, client).await?;
                Driver::Ddl
            }
            StatementKind::Unknown => {
                return Err(EngineError::UnsupportedStatement {
                    kind: statement.kind().to_string(),
                });
            }
        };

        Ok(Self {
            db,
            sql: bound.to_string(),
            driver,
            last_row_id,
        })
    }

    fn trace_failure<T>(&self, result: EngineResult<T>) -> EngineResult<T> {
        if let Err(err) = &result {
            error!(sql = %self.sql, %err, "failed SQL");
        }
        result
    }

    /// Row count: matched rows for SELECT, affected rows for
    /// UPDATE / DELETE
    pub async fn count(&mut self) -> EngineResult<u64> {
        let result = match &mut self.driver {
            Driver::Select(select) => select.count(&self.db).await,
            Driver::Update(update) => Ok(update.modified),
            Driver::Delete(delete) => Ok(delete.deleted),
            Driver::Insert(_) | Driver::Ddl => Err(EngineError::Unsupported(
                "count() is not available for this statement".to_string(),
            )),
        };
        self.trace_failure(result)
    }

    /// Next row of a SELECT; `None` for exhausted or non-row statements
    pub async fn next_row(&mut self) -> EngineResult<Option<Row>> {
        let result = match &mut self.driver {
            Driver::Select(select) => select.next_row(&self.db).await,
            _ => Ok(None),
        };
        self.trace_failure(result)
    }

    /// Drain all remaining rows
    pub async fn rows(&mut self) -> EngineResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Identifier of the last inserted row: the auto-sequence value,
    /// or the stringified inserted id
    pub fn last_row_id(&self) -> Option<&Bson> {
        self.last_row_id.as_ref()
    }

    /// Drop the open cursor, if any; idempotent
    pub fn close(&mut self) {
        if let Driver::Select(select) = &mut self.driver {
            select.close();
        }
    }
}
