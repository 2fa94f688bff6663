// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sql2mongo - execution engine
//!
//! The engine drives parsed SQL statements against MongoDB. Statement
//! drivers combine the transpiler's clause converters, decide between
//! a `find` call and an aggregation pipeline, run the driver operation
//! and present rows; the [`ResultSet`] façade dispatches one SQL string
//! to the right driver and exposes the relational-client surface:
//! `count`, row iteration, `close` and `last_row_id`.
//!
//! Reads are lazy: a SELECT opens its cursor on first demand. Writes
//! and DDL execute eagerly while the façade parses the statement.
//!
//! ## Entry point
//!
//! ```rust,ignore
//! use sql2mongo_engine::parse;
//!
//! let client = mongodb::Client::with_uri_str("mongodb://localhost").await?;
//! let db = client.database("app");
//! let mut result = parse(
//!     client,
//!     db,
//!     "SELECT \"name\" FROM \"users\" WHERE \"age\" > %s",
//!     vec![bson::Bson::Int32(21)],
//! )
//! .await?;
//! while let Some(row) = result.next_row().await? {
//!     println!("{:?}", row);
//! }
//! ```

pub mod ddl;
pub mod error;
pub mod result;
pub mod schema;
pub mod select;
pub mod write;

use bson::Bson;
use mongodb::{Client, Database};

// Re-export commonly used types
pub use error::{EngineError, EngineResult};
pub use result::{ResultSet, Row};
pub use schema::{AutoSequence, SCHEMA_COLLECTION, SchemaEntry};
pub use select::{SelectDriver, SelectPlan};
pub use write::{DeleteDriver, DeletePlan, InsertDriver, InsertPlan, UpdateDriver, UpdatePlan};

/// Parse one SQL statement and execute it against `db`
///
/// SELECT statements stay lazy until the result is consumed; INSERT,
/// UPDATE, DELETE and DDL run before this function returns.
pub async fn parse(
    client: Client,
    db: Database,
    sql: &str,
    params: Vec<Bson>,
) -> EngineResult<ResultSet> {
    ResultSet::new(&client, db, sql, params).await
}
