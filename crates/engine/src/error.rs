// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Error types for the execution engine

use sql2mongo_tokenizer::TokenizeError;
use sql2mongo_transpiler::TranspileError;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by statement execution
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The SQL string did not tokenize
    #[error("malformed SQL: {0}")]
    Tokenize(#[from] TokenizeError),

    /// Lowering to MongoDB documents failed
    #[error(transparent)]
    Transpile(#[from] TranspileError),

    /// The MongoDB operation itself failed
    #[error("MongoDB operation failed: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// A `__schema__` bookkeeping document did not decode
    #[error("malformed schema document: {0}")]
    Schema(#[from] bson::de::Error),

    /// More than one statement in the input
    #[error("multiple statements are not supported")]
    MultipleStatements,

    /// A statement kind outside the accepted dialect
    #[error("unsupported statement kind {kind}")]
    UnsupportedStatement { kind: String },

    /// An operation that does not apply to the executed statement
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_errors_convert() {
        let err: EngineError = TranspileError::JoinInWhere.into();
        assert!(matches!(err, EngineError::Transpile(_)));
    }

    #[test]
    fn test_display_carries_kind() {
        let err = EngineError::UnsupportedStatement {
            kind: "EXPLAIN".to_string(),
        };
        assert!(format!("{}", err).contains("EXPLAIN"));
    }
}
