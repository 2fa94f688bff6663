// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sql2mongo - SQL to MongoDB lowering
//!
//! This crate lowers parsed SQL clauses into MongoDB query documents.
//! It owns the three layers between the token tree and the drivers:
//!
//! - **Identifier resolution** ([`ident`]): a narrow view over one
//!   token that resolves table names through the per-query alias map.
//! - **Predicate trees** ([`predicate`]): the WHERE engine. A single
//!   left-to-right scan builds operator nodes in an arena, a
//!   precedence-ordered evaluate pass folds them into one root, and an
//!   emit pass renders `bson` documents with negation already pushed
//!   down through the tree.
//! - **Clause converters** ([`converters`]): one type per SQL clause,
//!   each parsing from a known token offset and emitting either a
//!   `find` fragment or an aggregation pipeline stage. The execution
//!   mode picks which emission function is called; a converter's type
//!   never changes.
//!
//! Everything here is pure: the crate emits documents but never talks
//! to a server.

pub mod context;
pub mod converters;
pub mod error;
pub mod ident;
pub mod predicate;

// Re-export commonly used types
pub use context::{EmitContext, QueryContext};
pub use converters::{
    ColumnSelect, FromClause, JoinClause, JoinKind, LimitClause, OrderClause, OrderItem,
    SelectedColumn, SetClause, WhereClause,
};
pub use error::{TranspileError, TranspileResult};
pub use ident::{AliasMap, AliasTarget, SqlIdent, column_table, qualified_field, resolve_table};
pub use predicate::PredicateTree;
