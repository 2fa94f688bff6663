// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Shared helpers for the sql2mongo test suites

use bson::Bson;
use sql2mongo_tokenizer::{Statement, number_placeholders, parse_sql};

/// Bind positional placeholders and parse exactly one statement
///
/// # Panics
///
/// Panics when the SQL does not parse to exactly one statement; the
/// test suites treat that as a test bug.
pub fn parse_one(sql: &str) -> Statement {
    let bound = number_placeholders(sql);
    let mut statements = parse_sql(&bound).expect("test SQL should tokenize");
    assert_eq!(
        statements.len(),
        1,
        "test SQL should contain exactly one statement"
    );
    statements.remove(0)
}

/// Integer parameters for the common test shape
pub fn int_params(values: &[i64]) -> Vec<Bson> {
    values.iter().map(|&v| Bson::Int64(v)).collect()
}

/// String parameters
pub fn str_params(values: &[&str]) -> Vec<Bson> {
    values.iter().map(|v| Bson::String(v.to_string())).collect()
}
