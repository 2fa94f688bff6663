// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Grouping passes that fold the flat leaf stream into a token tree
//!
//! The passes mirror the shapes the statement drivers expect:
//!
//! 1. parentheses are grouped recursively off a stack,
//! 2. compound join keywords are merged into single keyword leaves,
//! 3. the `WHERE` clause is grouped up to its terminating keyword,
//! 4. within every group: functions, identifiers (with dotted
//!    qualifiers), ordering wrappers, aliases, comparisons and
//!    comma-separated lists.
//!
//! Grouping never validates: tokens that fit no pattern are left in
//! place and surface later as unsupported SQL.

use crate::error::{TokenizeError, TokenizeResult};
use crate::lexer::lex;
use crate::token::{next_in, prev_in, Group, GroupKind, Leaf, Statement, Token, TokenKind};

/// Keywords that end a `WHERE` clause
const WHERE_TERMINATORS: &[&str] = &["ORDER", "GROUP", "LIMIT", "HAVING", "UNION"];

/// Parse a SQL string into its statements
pub fn parse_sql(sql: &str) -> TokenizeResult<Vec<Statement>> {
    let leaves = lex(sql)?;
    let mut statements = Vec::new();

    for chunk in split_statements(leaves) {
        let mut children = group_parens(chunk)?;
        merge_compound_keywords(&mut children);
        group_where(&mut children);
        refine(&mut children);
        trim_whitespace(&mut children);
        if children.is_empty() {
            continue;
        }
        statements.push(Statement { children });
    }

    if statements.is_empty() {
        return Err(TokenizeError::EmptyStatement);
    }
    Ok(statements)
}

/// Split the leaf stream on statement separators
fn split_statements(leaves: Vec<Leaf>) -> Vec<Vec<Leaf>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for leaf in leaves {
        if leaf.kind == TokenKind::Punctuation && leaf.text == ";" {
            chunks.push(std::mem::take(&mut current));
        } else {
            current.push(leaf);
        }
    }
    chunks.push(current);
    chunks
        .into_iter()
        .filter(|c| c.iter().any(|l| l.kind != TokenKind::Whitespace))
        .collect()
}

/// Group balanced parentheses into `Parenthesis` nodes
fn group_parens(leaves: Vec<Leaf>) -> TokenizeResult<Vec<Token>> {
    let mut stack: Vec<Vec<Token>> = vec![Vec::new()];

    for leaf in leaves {
        let is_open = leaf.kind == TokenKind::Punctuation && leaf.text == "(";
        let is_close = leaf.kind == TokenKind::Punctuation && leaf.text == ")";

        if is_open {
            stack.push(vec![Token::Leaf(leaf)]);
        } else if is_close {
            if stack.len() < 2 {
                return Err(TokenizeError::UnbalancedParens);
            }
            let Some(mut children) = stack.pop() else {
                return Err(TokenizeError::UnbalancedParens);
            };
            children.push(Token::Leaf(leaf));
            let Some(parent) = stack.last_mut() else {
                return Err(TokenizeError::UnbalancedParens);
            };
            parent.push(Token::Group(Group {
                kind: GroupKind::Parenthesis,
                children,
            }));
        } else {
            let Some(top) = stack.last_mut() else {
                return Err(TokenizeError::UnbalancedParens);
            };
            top.push(Token::Leaf(leaf));
        }
    }

    if stack.len() != 1 {
        return Err(TokenizeError::UnbalancedParens);
    }
    stack.pop().ok_or(TokenizeError::UnbalancedParens)
}

fn keyword_leaf(text: &str) -> Token {
    Token::Leaf(Leaf {
        kind: TokenKind::Keyword,
        text: text.to_string(),
    })
}

/// Merge `INNER JOIN` and `LEFT OUTER JOIN` into single keyword leaves
fn merge_compound_keywords(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        if children[i].is_keyword("INNER") {
            if let Some((j, t)) = next_in(children, i) {
                if t.is_keyword("JOIN") {
                    children.splice(i..=j, [keyword_leaf("INNER JOIN")]);
                }
            }
        } else if children[i].is_keyword("LEFT") {
            if let Some((j, t)) = next_in(children, i) {
                if t.is_keyword("OUTER") {
                    if let Some((k, t2)) = next_in(children, j) {
                        if t2.is_keyword("JOIN") {
                            children.splice(i..=k, [keyword_leaf("LEFT OUTER JOIN")]);
                        }
                    }
                }
            }
        }
        i += 1;
    }
}

/// Group the `WHERE` clause up to its terminating keyword
fn group_where(children: &mut Vec<Token>) {
    let Some(start) = children.iter().position(|t| t.is_keyword("WHERE")) else {
        return;
    };
    let end = children
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, t)| WHERE_TERMINATORS.iter().any(|k| t.is_keyword(k)))
        .map(|(i, _)| i)
        .unwrap_or(children.len());

    let body: Vec<Token> = children.drain(start..end).collect();
    children.insert(
        start,
        Token::Group(Group {
            kind: GroupKind::Where,
            children: body,
        }),
    );
}

/// Apply the structural passes to a child list, depth first
fn refine(children: &mut Vec<Token>) {
    for child in children.iter_mut() {
        if let Token::Group(g) = child {
            refine(&mut g.children);
        }
    }
    group_functions(children);
    group_identifiers(children);
    group_ordered(children);
    group_aliases(children);
    group_comparisons(children);
    group_lists(children);
}

fn is_name_leaf(token: &Token) -> bool {
    token.leaf_kind() == Some(TokenKind::Name)
}

/// An identifier group holding exactly one bare name leaf
fn is_single_name(token: &Token) -> bool {
    match token {
        Token::Group(g) if g.kind == GroupKind::Identifier => {
            g.children.len() == 1 && is_name_leaf(&g.children[0])
        }
        _ => false,
    }
}

/// `name(…)` with the parenthesis directly adjacent becomes a function
fn group_functions(children: &mut Vec<Token>) {
    let mut i = 0;
    while i + 1 < children.len() {
        let head_is_word = matches!(&children[i], Token::Leaf(l)
            if l.kind == TokenKind::Name && !l.text.starts_with('"'));
        if head_is_word && children[i + 1].is_group(GroupKind::Parenthesis) {
            let paren = children.remove(i + 1);
            let name = children.remove(i);
            children.insert(
                i,
                Token::Group(Group {
                    kind: GroupKind::Function,
                    children: vec![name, paren],
                }),
            );
        }
        i += 1;
    }
}

/// Wrap name leaves (and adjacent dotted chains) into identifier groups
fn group_identifiers(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        if is_name_leaf(&children[i]) {
            let mut end = i;
            if i + 2 < children.len()
                && children[i + 1].is_punctuation(".")
                && is_name_leaf(&children[i + 2])
            {
                end = i + 2;
            }
            let grouped: Vec<Token> = children.drain(i..=end).collect();
            children.insert(
                i,
                Token::Group(Group {
                    kind: GroupKind::Identifier,
                    children: grouped,
                }),
            );
        }
        i += 1;
    }
}

/// Wrap `<identifier> ASC|DESC` into an ordering identifier
fn group_ordered(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        if children[i].is_group(GroupKind::Identifier) {
            if let Some((j, t)) = next_in(children, i) {
                if t.is_keyword("ASC") || t.is_keyword("DESC") {
                    let grouped: Vec<Token> = children.drain(i..=j).collect();
                    children.insert(
                        i,
                        Token::Group(Group {
                            kind: GroupKind::Identifier,
                            children: grouped,
                        }),
                    );
                }
            }
        }
        i += 1;
    }
}

/// Attach `AS <name>` / implicit trailing aliases to identifiers,
/// functions and parenthesized expressions
fn group_aliases(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        let head_ok = children[i].is_group(GroupKind::Identifier)
            || children[i].is_group(GroupKind::Function)
            || children[i].is_group(GroupKind::Parenthesis);
        if head_ok {
            let mut end = None;
            if let Some((j, t)) = next_in(children, i) {
                if t.is_keyword("AS") {
                    if let Some((k, t2)) = next_in(children, j) {
                        if is_single_name(t2) {
                            end = Some(k);
                        }
                    }
                } else if is_single_name(t) {
                    end = Some(j);
                }
            }
            if let Some(k) = end {
                let mut grouped: Vec<Token> = children.drain(i..=k).collect();
                // the alias was wrapped by the identifier pass; unwrap it
                // back to its name leaf so the alias accessor sees it
                if let Some(last) = grouped.pop() {
                    match last {
                        Token::Group(g) if g.kind == GroupKind::Identifier => {
                            grouped.extend(g.children);
                        }
                        other => grouped.push(other),
                    }
                }
                children.insert(
                    i,
                    Token::Group(Group {
                        kind: GroupKind::Identifier,
                        children: grouped,
                    }),
                );
            }
        }
        i += 1;
    }
}

fn is_comparison_operand(token: &Token) -> bool {
    token.is_group(GroupKind::Identifier)
        || token.is_group(GroupKind::Function)
        || token.is_keyword("NULL")
        || matches!(token, Token::Leaf(l) if matches!(
            l.kind,
            TokenKind::Placeholder | TokenKind::Number | TokenKind::StringLiteral
        ))
}

/// Group `lhs op rhs` triples into comparison nodes
fn group_comparisons(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        let is_op = matches!(&children[i], Token::Leaf(l) if l.kind == TokenKind::Operator);
        if is_op {
            let sides = (prev_in(children, i), next_in(children, i));
            if let (Some((li, lt)), Some((ri, rt))) = sides {
                if is_comparison_operand(lt) && is_comparison_operand(rt) {
                    let grouped: Vec<Token> = children.drain(li..=ri).collect();
                    children.insert(
                        li,
                        Token::Group(Group {
                            kind: GroupKind::Comparison,
                            children: grouped,
                        }),
                    );
                    i = li;
                }
            }
        }
        i += 1;
    }
}

fn is_list_element(token: &Token) -> bool {
    token.is_group(GroupKind::Identifier)
        || token.is_group(GroupKind::Function)
        || token.is_group(GroupKind::Comparison)
        || token.is_keyword("NULL")
        || matches!(token, Token::Leaf(l) if matches!(
            l.kind,
            TokenKind::Placeholder | TokenKind::Number | TokenKind::StringLiteral
        ))
}

/// Group comma-separated element runs into identifier lists
fn group_lists(children: &mut Vec<Token>) {
    let mut i = 0;
    while i < children.len() {
        if is_list_element(&children[i]) {
            let mut end = i;
            loop {
                let Some((j, t)) = next_in(children, end) else {
                    break;
                };
                if !t.is_punctuation(",") {
                    break;
                }
                let Some((k, t2)) = next_in(children, j) else {
                    break;
                };
                if !is_list_element(t2) {
                    break;
                }
                end = k;
            }
            if end > i {
                let grouped: Vec<Token> = children.drain(i..=end).collect();
                children.insert(
                    i,
                    Token::Group(Group {
                        kind: GroupKind::IdentifierList,
                        children: grouped,
                    }),
                );
            }
        }
        i += 1;
    }
}

fn trim_whitespace(children: &mut Vec<Token>) {
    while children.first().is_some_and(Token::is_whitespace) {
        children.remove(0);
    }
    while children.last().is_some_and(Token::is_whitespace) {
        children.pop();
    }
}
