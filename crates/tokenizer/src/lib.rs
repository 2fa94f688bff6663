// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sql2mongo - SQL tokenizer
//!
//! This crate turns one SQL string into a sqlparse-style token tree:
//! a flat lex pass produces typed leaf tokens (keywords, names,
//! placeholders, operators, punctuation, whitespace), and a grouping
//! pass folds them into `Statement`s whose children may themselves be
//! groups (`Parenthesis`, `Identifier`, `IdentifierList`, `Comparison`,
//! `Function`, `Where`).
//!
//! The tokenizer is deliberately non-validating: it accepts the dialect
//! the translation engine understands (double-quoted identifiers,
//! positional `%s` / numbered `%(k)s` placeholders) and leaves semantic
//! checks to the downstream layers. Every node can reconstruct its
//! exact source text via [`Token::value`], which the engine relies on
//! when it re-parses a clause body.
//!
//! ## Navigation
//!
//! Groups expose ordered, whitespace-skipping traversal through
//! [`Token::token_next`] / [`Token::token_prev`], mirroring the index
//! based walk the statement drivers perform.

pub mod error;
pub mod grouper;
pub mod lexer;
pub mod params;
pub mod token;

// Re-export commonly used types
pub use error::{TokenizeError, TokenizeResult};
pub use grouper::parse_sql;
pub use params::{number_placeholders, placeholder_index};
pub use token::{Group, GroupKind, Leaf, Statement, StatementKind, Token, TokenKind, unquote};
