// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Token tree types and navigation
//!
//! A [`Token`] is either a [`Leaf`] carrying a type tag and its source
//! text, or a [`Group`] owning an ordered child list. [`Statement`]
//! wraps the top level of one parsed statement and classifies it from
//! its leading DML/DDL keyword.
//!
//! Identifier groups expose the accessors the resolver layer builds on:
//! real name, qualifier, alias and ordering direction. All name
//! accessors return the unquoted form; leaf text always keeps the
//! original quoting so source reconstruction stays exact.

use std::fmt;

/// Type tag of a leaf token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// SELECT / INSERT / UPDATE / DELETE
    Dml,
    /// CREATE / DROP / ALTER
    Ddl,
    Keyword,
    /// Bare or double-quoted identifier atom
    Name,
    Placeholder,
    Number,
    StringLiteral,
    /// Comparison operator (`=`, `>`, `<`, `>=`, `<=`)
    Operator,
    Punctuation,
    /// `*`
    Wildcard,
    Whitespace,
}

/// Kind of a grouped token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// `( … )` including both parenthesis punctuation children
    Parenthesis,
    /// Possibly qualified, aliased or ordered identifier
    Identifier,
    /// Comma-separated list of identifiers, comparisons or placeholders
    IdentifierList,
    /// `lhs op rhs`
    Comparison,
    /// `name( … )` with no space between name and parenthesis
    Function,
    /// `WHERE …` up to the end of the clause
    Where,
}

/// Leaf token: a type tag plus the exact source slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub kind: TokenKind,
    pub text: String,
}

/// Group token: a kind plus ordered children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: GroupKind,
    pub children: Vec<Token>,
}

/// One node of the token tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Leaf(Leaf),
    Group(Group),
}

/// Strip one level of double quotes from an identifier atom
pub fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Next non-whitespace child strictly after `index`
pub(crate) fn next_in(children: &[Token], index: usize) -> Option<(usize, &Token)> {
    children
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, t)| !t.is_whitespace())
}

/// Previous non-whitespace child strictly before `index`
pub(crate) fn prev_in(children: &[Token], index: usize) -> Option<(usize, &Token)> {
    children[..index]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, t)| !t.is_whitespace())
}

impl Token {
    pub fn leaf_kind(&self) -> Option<TokenKind> {
        match self {
            Token::Leaf(l) => Some(l.kind),
            Token::Group(_) => None,
        }
    }

    pub fn group_kind(&self) -> Option<GroupKind> {
        match self {
            Token::Leaf(_) => None,
            Token::Group(g) => Some(g.kind),
        }
    }

    pub fn is_group(&self, kind: GroupKind) -> bool {
        self.group_kind() == Some(kind)
    }

    pub fn is_whitespace(&self) -> bool {
        self.leaf_kind() == Some(TokenKind::Whitespace)
    }

    /// Check for a keyword leaf with the given (case-insensitive) text
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Leaf(l)
            if l.kind == TokenKind::Keyword && l.text.eq_ignore_ascii_case(word))
    }

    pub fn is_dml(&self, word: &str) -> bool {
        matches!(self, Token::Leaf(l)
            if l.kind == TokenKind::Dml && l.text.eq_ignore_ascii_case(word))
    }

    pub fn is_ddl(&self, word: &str) -> bool {
        matches!(self, Token::Leaf(l)
            if l.kind == TokenKind::Ddl && l.text.eq_ignore_ascii_case(word))
    }

    pub fn is_punctuation(&self, text: &str) -> bool {
        matches!(self, Token::Leaf(l) if l.kind == TokenKind::Punctuation && l.text == text)
    }

    pub fn is_placeholder(&self) -> bool {
        self.leaf_kind() == Some(TokenKind::Placeholder)
    }

    pub fn is_wildcard(&self) -> bool {
        self.leaf_kind() == Some(TokenKind::Wildcard)
    }

    /// Source text of a leaf token
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Leaf(l) => Some(&l.text),
            Token::Group(_) => None,
        }
    }

    /// Reconstruct the exact source text of this node
    pub fn value(&self) -> String {
        let mut out = String::new();
        self.write_value(&mut out);
        out
    }

    fn write_value(&self, out: &mut String) {
        match self {
            Token::Leaf(l) => out.push_str(&l.text),
            Token::Group(g) => {
                for child in &g.children {
                    child.write_value(out);
                }
            }
        }
    }

    /// Ordered children; empty for a leaf
    pub fn children(&self) -> &[Token] {
        match self {
            Token::Leaf(_) => &[],
            Token::Group(g) => &g.children,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.children().get(index)
    }

    /// Next non-whitespace child strictly after `index`
    pub fn token_next(&self, index: usize) -> Option<(usize, &Token)> {
        next_in(self.children(), index)
    }

    /// Previous non-whitespace child strictly before `index`
    pub fn token_prev(&self, index: usize) -> Option<(usize, &Token)> {
        prev_in(self.children(), index)
    }

    /// First non-whitespace child
    pub fn first_token(&self) -> Option<(usize, &Token)> {
        self.children()
            .iter()
            .enumerate()
            .find(|(_, t)| !t.is_whitespace())
    }

    fn identifier_children(&self) -> Option<&[Token]> {
        match self {
            Token::Group(g) if g.kind == GroupKind::Identifier => Some(&g.children),
            _ => None,
        }
    }

    /// Real (rightmost) name of an identifier, unquoted
    pub fn real_name(&self) -> Option<&str> {
        let children = self.identifier_children()?;
        match children.first()? {
            t if t.is_group(GroupKind::Identifier) => t.real_name(),
            Token::Leaf(l) if l.kind == TokenKind::Name => {
                if children.len() >= 3
                    && children[1].is_punctuation(".")
                    && matches!(&children[2], Token::Leaf(l2) if l2.kind == TokenKind::Name)
                {
                    children[2].text().map(unquote)
                } else {
                    Some(unquote(&l.text))
                }
            }
            _ => None,
        }
    }

    /// Qualifier (the part before the dot) of an identifier, unquoted
    pub fn parent_name(&self) -> Option<&str> {
        let children = self.identifier_children()?;
        match children.first()? {
            t if t.is_group(GroupKind::Identifier) => t.parent_name(),
            Token::Leaf(l) if l.kind == TokenKind::Name => {
                if children.len() >= 3
                    && children[1].is_punctuation(".")
                    && matches!(&children[2], Token::Leaf(l2) if l2.kind == TokenKind::Name)
                {
                    Some(unquote(&l.text))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Alias of an identifier (explicit `AS` or trailing name), unquoted
    pub fn alias(&self) -> Option<&str> {
        let children = self.identifier_children()?;
        if let Some(pos) = children.iter().position(|t| t.is_keyword("AS")) {
            return children[pos..].iter().find_map(|t| match t {
                Token::Leaf(l) if l.kind == TokenKind::Name => Some(unquote(&l.text)),
                _ => None,
            });
        }
        let chain_end = if children.len() >= 3 && children[1].is_punctuation(".") {
            2
        } else {
            0
        };
        children.iter().skip(chain_end + 1).find_map(|t| match t {
            Token::Leaf(l) if l.kind == TokenKind::Name => Some(unquote(&l.text)),
            _ => None,
        })
    }

    /// Name an identifier is known by: its alias, or its real name
    pub fn get_name(&self) -> Option<&str> {
        self.alias().or_else(|| self.real_name())
    }

    /// Ordering keyword (`ASC` / `DESC`) attached to an identifier
    pub fn ordering(&self) -> Option<&str> {
        let children = self.identifier_children()?;
        children.iter().rev().find_map(|t| match t {
            Token::Leaf(l)
                if l.kind == TokenKind::Keyword
                    && (l.text.eq_ignore_ascii_case("ASC")
                        || l.text.eq_ignore_ascii_case("DESC")) =>
            {
                Some(l.text.as_str())
            }
            _ => None,
        })
    }

    /// Elements of an identifier list, skipping whitespace and commas
    pub fn identifiers(&self) -> Vec<&Token> {
        match self {
            Token::Group(g) if g.kind == GroupKind::IdentifierList => g
                .children
                .iter()
                .filter(|t| !t.is_whitespace() && t.leaf_kind() != Some(TokenKind::Punctuation))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Left operand of a comparison group
    pub fn comparison_left(&self) -> Option<&Token> {
        match self {
            Token::Group(g) if g.kind == GroupKind::Comparison => {
                self.first_token().map(|(_, t)| t)
            }
            _ => None,
        }
    }

    /// Right operand of a comparison group
    pub fn comparison_right(&self) -> Option<&Token> {
        match self {
            Token::Group(g) if g.kind == GroupKind::Comparison => {
                g.children.iter().rev().find(|t| !t.is_whitespace())
            }
            _ => None,
        }
    }

    /// Operator text of a comparison group
    pub fn comparison_operator(&self) -> Option<&str> {
        match self {
            Token::Group(g) if g.kind == GroupKind::Comparison => {
                g.children.iter().find_map(|t| match t {
                    Token::Leaf(l) if l.kind == TokenKind::Operator => Some(l.text.as_str()),
                    _ => None,
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Statement category derived from the leading DML/DDL keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Create => "CREATE",
            StatementKind::Drop => "DROP",
            StatementKind::Alter => "ALTER",
            StatementKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// One parsed statement: the top-level child list of the token tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub(crate) children: Vec<Token>,
}

impl Statement {
    pub fn children(&self) -> &[Token] {
        &self.children
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.children.get(index)
    }

    pub fn token_next(&self, index: usize) -> Option<(usize, &Token)> {
        next_in(&self.children, index)
    }

    pub fn token_prev(&self, index: usize) -> Option<(usize, &Token)> {
        prev_in(&self.children, index)
    }

    pub fn first_token(&self) -> Option<(usize, &Token)> {
        self.children
            .iter()
            .enumerate()
            .find(|(_, t)| !t.is_whitespace())
    }

    /// Classify the statement from its first DML/DDL keyword
    pub fn kind(&self) -> StatementKind {
        let Some((_, first)) = self.first_token() else {
            return StatementKind::Unknown;
        };
        let word = match first {
            Token::Leaf(l) if matches!(l.kind, TokenKind::Dml | TokenKind::Ddl) => {
                l.text.to_ascii_uppercase()
            }
            _ => return StatementKind::Unknown,
        };
        match word.as_str() {
            "SELECT" => StatementKind::Select,
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "CREATE" => StatementKind::Create,
            "DROP" => StatementKind::Drop,
            "ALTER" => StatementKind::Alter,
            _ => StatementKind::Unknown,
        }
    }

    /// Reconstruct the exact source text of the statement
    pub fn value(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Token::Leaf(l) => out.push_str(&l.text),
                Token::Group(_) => out.push_str(&child.value()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Token {
        Token::Leaf(Leaf {
            kind: TokenKind::Name,
            text: text.to_string(),
        })
    }

    fn ws() -> Token {
        Token::Leaf(Leaf {
            kind: TokenKind::Whitespace,
            text: " ".to_string(),
        })
    }

    fn kw(text: &str) -> Token {
        Token::Leaf(Leaf {
            kind: TokenKind::Keyword,
            text: text.to_string(),
        })
    }

    fn punct(text: &str) -> Token {
        Token::Leaf(Leaf {
            kind: TokenKind::Punctuation,
            text: text.to_string(),
        })
    }

    fn ident(children: Vec<Token>) -> Token {
        Token::Group(Group {
            kind: GroupKind::Identifier,
            children,
        })
    }

    #[test]
    fn test_qualified_identifier_names() {
        let tok = ident(vec![name("\"t\""), punct("."), name("\"col\"")]);
        assert_eq!(tok.real_name(), Some("col"));
        assert_eq!(tok.parent_name(), Some("t"));
        assert_eq!(tok.alias(), None);
    }

    #[test]
    fn test_alias_with_as_keyword() {
        let tok = ident(vec![name("\"col\""), ws(), kw("AS"), ws(), name("\"c\"")]);
        assert_eq!(tok.real_name(), Some("col"));
        assert_eq!(tok.alias(), Some("c"));
        assert_eq!(tok.get_name(), Some("c"));
    }

    #[test]
    fn test_implicit_alias() {
        let tok = ident(vec![name("\"table1\""), ws(), name("\"t1\"")]);
        assert_eq!(tok.real_name(), Some("table1"));
        assert_eq!(tok.alias(), Some("t1"));
    }

    #[test]
    fn test_ordered_identifier_delegates_names() {
        let inner = ident(vec![name("\"a\"")]);
        let outer = ident(vec![inner, ws(), kw("DESC")]);
        assert_eq!(outer.ordering(), Some("DESC"));
        assert_eq!(outer.real_name(), Some("a"));
        assert_eq!(outer.alias(), None);
    }

    #[test]
    fn test_navigation_skips_whitespace() {
        let group = Token::Group(Group {
            kind: GroupKind::Parenthesis,
            children: vec![punct("("), ws(), name("\"a\""), ws(), punct(")")],
        });
        let (idx, tok) = group.token_next(0).unwrap();
        assert_eq!(idx, 2);
        assert_eq!(tok.text(), Some("\"a\""));
        let (idx, tok) = group.token_prev(4).unwrap();
        assert_eq!(idx, 2);
        assert!(tok.text().is_some());
    }

    #[test]
    fn test_value_roundtrip() {
        let tok = ident(vec![name("\"t\""), punct("."), name("\"col\"")]);
        assert_eq!(tok.value(), "\"t\".\"col\"");
    }
}
