// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Error types for the lowering layer

use sql2mongo_tokenizer::TokenizeError;

/// Result type alias for lowering operations
pub type TranspileResult<T> = Result<T, TranspileError>;

/// Errors raised while lowering SQL to MongoDB documents
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum TranspileError {
    /// Structurally unparseable, or missing a required keyword
    #[error("malformed SQL: {0}")]
    MalformedSql(String),

    /// Syntactically valid but outside the accepted dialect
    #[error("unsupported SQL construct: {0}")]
    Unsupported(String),

    /// A token did not have the shape an identifier accessor expected
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// An IN list containing something other than placeholders or NULL
    #[error("IN list may only contain placeholders or NULL")]
    UnsupportedInList,

    /// A WHERE comparison whose right-hand side is another column
    #[error("join predicates in WHERE are not supported")]
    JoinInWhere,

    /// A value position that is not a numbered placeholder
    #[error("not a parameter placeholder: {0}")]
    PlaceholderSyntax(String),

    /// A placeholder index outside the bound parameter list
    #[error("parameter index {index} out of range for {available} parameters")]
    ParameterIndex { index: usize, available: usize },

    /// Re-parsing a clause body failed at the tokenizer
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}
