// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for WHERE lowering: precedence, negation
//! push-down, membership lists and nested subqueries

use bson::{Bson, Document, doc};
use pretty_assertions::assert_eq;
use sql2mongo_test_utils::{int_params, parse_one};
use sql2mongo_tokenizer::GroupKind;
use sql2mongo_transpiler::{
    ColumnSelect, EmitContext, FromClause, QueryContext, TranspileError, WhereClause,
};

/// Minimal SELECT walk: projection, FROM and WHERE
fn parse_select(sql: &str, params: Vec<Bson>) -> (QueryContext, Option<WhereClause>) {
    let statement = parse_one(sql);
    let mut ctx = QueryContext::new(params);
    let mut where_clause = None;

    let (mut token_id, mut token) = statement.first_token().unwrap();
    loop {
        let end_id;
        if token.is_dml("SELECT") {
            end_id = ColumnSelect::parse(&statement, token_id, &mut ctx).unwrap().end_id;
        } else if token.is_keyword("FROM") {
            end_id = FromClause::parse(&statement, token_id, &mut ctx).unwrap().end_id;
        } else if token.is_group(GroupKind::Where) {
            let clause = WhereClause::parse(&statement, token_id, &mut ctx).unwrap();
            end_id = clause.end_id;
            where_clause = Some(clause);
        } else {
            panic!("unexpected clause: {}", token.value());
        }
        match statement.token_next(end_id) {
            Some((next_id, next)) => {
                token_id = next_id;
                token = next;
            }
            None => break,
        }
    }
    (ctx, where_clause)
}

fn filter_of(sql: &str, params: Vec<Bson>) -> Document {
    filter_with_nested(sql, params, None)
}

fn filter_with_nested(sql: &str, params: Vec<Bson>, nested: Option<&[Bson]>) -> Document {
    let (ctx, where_clause) = parse_select(sql, params);
    let ectx = EmitContext {
        left_table: ctx.require_left_table().unwrap(),
        aliases: &ctx.aliases,
        nested_result: nested,
    };
    where_clause.expect("query has a WHERE").filter(&ectx).unwrap()
}

#[test]
fn test_simple_comparison_filter() {
    let filter = filter_of(
        "SELECT \"a\", \"b\" FROM \"t\" WHERE \"x\" = %s",
        int_params(&[5]),
    );
    assert_eq!(filter, doc! { "x": { "$eq": 5_i64 } });
}

#[test]
fn test_membership_and_comparison() {
    let filter = filter_of(
        "SELECT * FROM \"t\" WHERE \"x\" IN (%s,%s) AND \"y\" > %s",
        int_params(&[1, 2, 3]),
    );
    assert_eq!(
        filter,
        doc! { "$and": [
            { "x": { "$in": [1_i64, 2_i64] } },
            { "y": { "$gt": 3_i64 } },
        ]}
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE \"p\" = %s AND \"q\" = %s OR \"r\" = %s",
        int_params(&[1, 2, 3]),
    );
    assert_eq!(
        filter,
        doc! { "$or": [
            { "$and": [ { "p": { "$eq": 1_i64 } }, { "q": { "$eq": 2_i64 } } ] },
            { "r": { "$eq": 3_i64 } },
        ]}
    );

    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE \"p\" = %s OR \"q\" = %s AND \"r\" = %s",
        int_params(&[1, 2, 3]),
    );
    assert_eq!(
        filter,
        doc! { "$or": [
            { "p": { "$eq": 1_i64 } },
            { "$and": [ { "q": { "$eq": 2_i64 } }, { "r": { "$eq": 3_i64 } } ] },
        ]}
    );
}

#[test]
fn test_de_morgan_negation() {
    // NOT (P AND Q) emits as P' OR Q' with $not-wrapped atoms
    let negated = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE NOT (\"x\" = %s AND \"y\" = %s)",
        int_params(&[1, 2]),
    );
    assert_eq!(
        negated,
        doc! { "$or": [
            { "x": { "$not": { "$eq": 1_i64 } } },
            { "y": { "$not": { "$eq": 2_i64 } } },
        ]}
    );
}

#[test]
fn test_negation_distributes_into_nested_groups() {
    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE NOT (\"x\" = %s AND (\"y\" = %s OR \"z\" = %s))",
        int_params(&[1, 2, 3]),
    );
    assert_eq!(
        filter,
        doc! { "$or": [
            { "x": { "$not": { "$eq": 1_i64 } } },
            { "$and": [
                { "y": { "$not": { "$eq": 2_i64 } } },
                { "z": { "$not": { "$eq": 3_i64 } } },
            ]},
        ]}
    );
}

#[test]
fn test_negated_membership_swaps_operator() {
    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE NOT (\"x\" IN (%s, %s))",
        int_params(&[1, 2]),
    );
    assert_eq!(filter, doc! { "x": { "$nin": [1_i64, 2_i64] } });
}

#[test]
fn test_not_in() {
    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE \"x\" NOT IN (%s, %s)",
        int_params(&[4, 5]),
    );
    assert_eq!(filter, doc! { "x": { "$nin": [4_i64, 5_i64] } });
}

#[test]
fn test_emission_is_stable() {
    let sql = "SELECT \"a\" FROM \"t\" WHERE (\"x\" = %s OR \"y\" IN (%s, %s)) AND \"z\" <= %s";
    let first = filter_of(sql, int_params(&[1, 2, 3, 4]));
    let second = filter_of(sql, int_params(&[1, 2, 3, 4]));
    assert_eq!(first, second);
}

#[test]
fn test_deeply_nested_parentheses() {
    let filter = filter_of(
        "SELECT \"a\" FROM \"t\" WHERE ((((\"x\" = %s))))",
        int_params(&[8]),
    );
    assert_eq!(filter, doc! { "x": { "$eq": 8_i64 } });
}

#[test]
fn test_qualified_fields_against_left_table() {
    let filter = filter_of(
        "SELECT \"t\".\"a\" FROM \"t\" WHERE \"u\".\"b\" = %s AND \"t\".\"c\" = %s",
        int_params(&[7, 8]),
    );
    assert_eq!(
        filter,
        doc! { "$and": [
            { "u.b": { "$eq": 7_i64 } },
            { "c": { "$eq": 8_i64 } },
        ]}
    );
}

#[test]
fn test_alias_resolves_to_left_table() {
    let filter = filter_of(
        "SELECT \"t1\".\"a\" FROM \"table1\" \"t1\" WHERE \"t1\".\"x\" = %s",
        int_params(&[3]),
    );
    assert_eq!(filter, doc! { "x": { "$eq": 3_i64 } });
}

#[test]
fn test_nested_subquery_is_recorded_and_substituted() {
    let sql = "SELECT \"a\" FROM \"t\" WHERE \"x\" NOT IN (SELECT \"y\" FROM \"u\")";
    let (ctx, where_clause) = parse_select(sql, Vec::new());
    let nested = ctx.nested.as_ref().expect("nested subquery recorded");
    assert_eq!(nested.value(), "SELECT \"y\" FROM \"u\"");

    // before resolution, emission fails
    let ectx = EmitContext {
        left_table: "t",
        aliases: &ctx.aliases,
        nested_result: None,
    };
    assert!(where_clause.as_ref().unwrap().filter(&ectx).is_err());

    // with the subquery drained, its values splice into the list
    let values = vec![Bson::Int64(10), Bson::Int64(20)];
    let ectx = EmitContext {
        left_table: "t",
        aliases: &ctx.aliases,
        nested_result: Some(&values),
    };
    let filter = where_clause.unwrap().filter(&ectx).unwrap();
    assert_eq!(filter, doc! { "x": { "$nin": [10_i64, 20_i64] } });
}

#[test]
fn test_join_predicate_in_where_rejected() {
    let statement = parse_one("SELECT \"a\" FROM \"t\" WHERE \"x\" = \"y\"");
    let mut ctx = QueryContext::new(Vec::new());
    ctx.left_table = Some("t".to_string());
    let where_id = statement
        .children()
        .iter()
        .position(|t| t.is_group(GroupKind::Where))
        .unwrap();
    let err = WhereClause::parse(&statement, where_id, &mut ctx).unwrap_err();
    assert_eq!(err, TranspileError::JoinInWhere);
}

#[test]
fn test_parameter_index_out_of_range() {
    let statement = parse_one("SELECT \"a\" FROM \"t\" WHERE \"x\" = %s AND \"y\" = %s");
    let mut ctx = QueryContext::new(int_params(&[1]));
    ctx.left_table = Some("t".to_string());
    let where_id = statement
        .children()
        .iter()
        .position(|t| t.is_group(GroupKind::Where))
        .unwrap();
    let err = WhereClause::parse(&statement, where_id, &mut ctx).unwrap_err();
    assert_eq!(
        err,
        TranspileError::ParameterIndex {
            index: 1,
            available: 1
        }
    );
}
