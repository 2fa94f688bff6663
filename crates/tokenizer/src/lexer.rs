// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Logos-based lexer for the accepted SQL dialect
//!
//! Whitespace is kept as a token of its own: the grouping pass and the
//! statement drivers navigate with whitespace-skipping helpers, but the
//! tree must be able to reproduce the original text byte for byte.

use logos::Logos;

use crate::error::{TokenizeError, TokenizeResult};
use crate::token::{Leaf, TokenKind};

/// Raw token shapes recognized by the generated lexer
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    // Positional `%s` or numbered `%(k)s` parameter markers
    #[regex(r"%\([0-9]+\)s|%s")]
    Placeholder,

    #[regex(r#""[^"]*""#)]
    QuotedName,

    #[regex(r"'[^']*'")]
    StringLiteral,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,

    #[token(">=")]
    GtEq,
    #[token("<=")]
    LtEq,
    #[token("=")]
    Eq,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,

    #[token("*")]
    Star,
}

const DML_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE"];

const DDL_KEYWORDS: &[&str] = &["CREATE", "DROP", "ALTER"];

const KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "AND", "OR", "NOT", "IN", "ON", "AS", "BY", "ORDER", "GROUP", "HAVING",
    "UNION", "LIMIT", "INNER", "JOIN", "LEFT", "OUTER", "DISTINCT", "SET", "INTO", "VALUES",
    "NULL", "TABLE", "DATABASE", "CONSTRAINT", "UNIQUE", "ADD", "PRIMARY", "KEY",
    "AUTOINCREMENT", "ASC", "DESC",
];

/// Classify a bare word as a keyword category or a plain name
fn classify_word(word: &str) -> TokenKind {
    let upper = word.to_ascii_uppercase();
    if DML_KEYWORDS.contains(&upper.as_str()) {
        TokenKind::Dml
    } else if DDL_KEYWORDS.contains(&upper.as_str()) {
        TokenKind::Ddl
    } else if KEYWORDS.contains(&upper.as_str()) {
        TokenKind::Keyword
    } else {
        TokenKind::Name
    }
}

/// Lex a SQL string into a flat list of leaf tokens
pub(crate) fn lex(sql: &str) -> TokenizeResult<Vec<Leaf>> {
    let mut lexer = RawToken::lexer(sql);
    let mut leaves = Vec::new();

    while let Some(item) = lexer.next() {
        let raw = item.map_err(|()| TokenizeError::UnexpectedChar {
            position: lexer.span().start,
        })?;
        let text = lexer.slice().to_string();
        let kind = match raw {
            RawToken::Whitespace => TokenKind::Whitespace,
            RawToken::Placeholder => TokenKind::Placeholder,
            RawToken::QuotedName => TokenKind::Name,
            RawToken::StringLiteral => TokenKind::StringLiteral,
            RawToken::Number => TokenKind::Number,
            RawToken::Word => classify_word(&text),
            RawToken::LParen
            | RawToken::RParen
            | RawToken::Comma
            | RawToken::Dot
            | RawToken::Semicolon => TokenKind::Punctuation,
            RawToken::GtEq | RawToken::LtEq | RawToken::Eq | RawToken::Gt | RawToken::Lt => {
                TokenKind::Operator
            }
            RawToken::Star => TokenKind::Wildcard,
        };
        leaves.push(Leaf { kind, text });
    }

    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        lex(sql).unwrap().into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_classifies_keywords() {
        assert_eq!(classify_word("select"), TokenKind::Dml);
        assert_eq!(classify_word("CREATE"), TokenKind::Ddl);
        assert_eq!(classify_word("Where"), TokenKind::Keyword);
        assert_eq!(classify_word("username"), TokenKind::Name);
    }

    #[test]
    fn test_lexes_quoted_names_and_placeholders() {
        let leaves = lex(r#"SELECT "a" FROM "t" WHERE "x" = %s"#).unwrap();
        let texts: Vec<&str> = leaves.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["SELECT", " ", "\"a\"", " ", "FROM", " ", "\"t\"", " ", "WHERE", " ", "\"x\"", " ", "=", " ", "%s"]
        );
        assert_eq!(leaves[2].kind, TokenKind::Name);
        assert_eq!(leaves[14].kind, TokenKind::Placeholder);
    }

    #[test]
    fn test_numbered_placeholder_is_one_token() {
        let leaves = lex("%(13)s").unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].kind, TokenKind::Placeholder);
        assert_eq!(leaves[0].text, "%(13)s");
    }

    #[test]
    fn test_compound_operators_lex_greedily() {
        assert_eq!(
            kinds(">= <="),
            vec![TokenKind::Operator, TokenKind::Whitespace, TokenKind::Operator]
        );
        let leaves = lex(">=").unwrap();
        assert_eq!(leaves[0].text, ">=");
    }

    #[test]
    fn test_rejects_unknown_characters() {
        let err = lex("SELECT !").unwrap_err();
        assert_eq!(err, TokenizeError::UnexpectedChar { position: 7 });
    }
}
