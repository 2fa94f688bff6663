// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! WHERE predicate trees
//!
//! The predicate engine works in three passes over an arena of tagged
//! nodes linked by indices:
//!
//! 1. **Construction**: a single left-to-right scan of one
//!    parenthesized group. Boolean and membership keywords allocate
//!    operator nodes, chain them through `lhs`/`rhs` links and insert
//!    them into the group's precedence list (highest precedence first;
//!    equal precedence keeps arrival order). Comparisons and nested
//!    groups allocate nodes but stay out of the precedence list.
//! 2. **Evaluation**: operators pop from the front of the precedence
//!    list. A boolean operator absorbs its neighbours into a flattened
//!    accumulator (splicing same-kind neighbours), then rewires the
//!    outer chain around itself. `NOT` pushes negation into its
//!    right-hand side and drops out of the chain. After the last pop
//!    the group collapses to a single inner operator.
//! 3. **Emission**: a read-only walk renders `bson` documents. By this
//!    point negation lives on the atoms (`$not` wrapping, `$in`/`$nin`
//!    swaps) and on boolean nodes as an And↔Or kind swap.
//!
//! Negating a group distributes to every operator constructed in it,
//! including nested groups. Negation marks are idempotent sets rather
//! than toggles: a lone comparison sits in both the precedence list
//! and the member list, and must not be flipped back by the second
//! visit.

use bson::{Bson, Document, doc};
use tracing::debug;

use sql2mongo_tokenizer::{GroupKind, Statement, Token, TokenKind, parse_sql, placeholder_index};

use crate::context::{EmitContext, QueryContext};
use crate::error::{TranspileError, TranspileResult};
use crate::ident::SqlIdent;

type NodeId = usize;

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_NOT_IN: u8 = 4;
const PREC_IN: u8 = 5;

/// Raw column reference; qualification is resolved at emission time
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldRef {
    qualifier: Option<String>,
    column: String,
}

/// Value list of an IN / NOT IN membership test
#[derive(Debug, Clone, PartialEq)]
enum InList {
    /// Constants bound from the parameter table
    Literal(Vec<Bson>),
    /// Spliced in from the nested subquery's result at emission
    Nested,
}

#[derive(Debug, Clone, PartialEq)]
enum BoolKind {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Cmp {
        field: FieldRef,
        operator: &'static str,
        constant: Bson,
    },
    In {
        field: FieldRef,
        values: InList,
    },
    NotIn {
        field: FieldRef,
        values: InList,
    },
    Not,
    And {
        acc: Vec<NodeId>,
    },
    Or {
        acc: Vec<NodeId>,
    },
    Paren {
        /// Precedence-ordered operators awaiting evaluation
        ops: Vec<NodeId>,
        /// Every operator constructed directly in this group
        members: Vec<NodeId>,
        /// Single operator left after evaluation
        inner: Option<NodeId>,
    },
    WhereRoot {
        inner: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    kind: NodeKind,
    negated: bool,
    precedence: u8,
    lhs: Option<NodeId>,
    rhs: Option<NodeId>,
}

/// An evaluated WHERE clause, ready for emission
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl PredicateTree {
    /// Build and evaluate the predicate tree for one WHERE token
    ///
    /// When the clause body is not already parenthesized, the body text
    /// is rewrapped in parentheses and re-parsed, mirroring how the
    /// clause was grouped in the first place.
    pub fn build(where_token: &Token, ctx: &mut QueryContext) -> TranspileResult<Self> {
        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            ctx,
        };

        // the whole body is already one parenthesized group
        let direct = match where_token.token_next(0) {
            Some((index, t))
                if t.is_group(GroupKind::Parenthesis)
                    && where_token.token_next(index).is_none() =>
            {
                Some(t)
            }
            _ => None,
        };

        let paren = match direct {
            Some(paren) => builder.build_paren(paren)?,
            None => {
                let body: String = where_token.children()[1..]
                    .iter()
                    .map(Token::value)
                    .collect();
                let wrapped = format!("({})", body.trim());
                let statements = parse_sql(&wrapped)?;
                let rewrapped = statements
                    .first()
                    .and_then(Statement::first_token)
                    .map(|(_, t)| t)
                    .filter(|t| t.is_group(GroupKind::Parenthesis))
                    .ok_or_else(|| TranspileError::MalformedSql(wrapped.clone()))?;
                builder.build_paren(rewrapped)?
            }
        };

        let mut tree = Self {
            nodes: builder.nodes,
            root: paren,
        };
        tree.evaluate_paren(paren)?;
        tree.root = tree.alloc(NodeKind::WhereRoot { inner: paren }, 0);
        Ok(tree)
    }

    fn alloc(&mut self, kind: NodeKind, precedence: u8) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            negated: false,
            precedence,
            lhs: None,
            rhs: None,
        });
        id
    }

    /// Effective boolean kind, accounting for pushed-down negation
    fn bool_kind(&self, id: NodeId) -> Option<BoolKind> {
        let node = &self.nodes[id];
        match (&node.kind, node.negated) {
            (NodeKind::And { .. }, false) | (NodeKind::Or { .. }, true) => Some(BoolKind::And),
            (NodeKind::Or { .. }, false) | (NodeKind::And { .. }, true) => Some(BoolKind::Or),
            _ => None,
        }
    }

    fn take_acc(&mut self, id: NodeId) -> Vec<NodeId> {
        match &mut self.nodes[id].kind {
            NodeKind::And { acc } | NodeKind::Or { acc } => std::mem::take(acc),
            _ => Vec::new(),
        }
    }

    fn acc_mut(&mut self, id: NodeId) -> TranspileResult<&mut Vec<NodeId>> {
        match &mut self.nodes[id].kind {
            NodeKind::And { acc } | NodeKind::Or { acc } => Ok(acc),
            _ => Err(TranspileError::MalformedSql(
                "not a boolean operator".to_string(),
            )),
        }
    }

    fn evaluate_paren(&mut self, id: NodeId) -> TranspileResult<()> {
        // idempotent: a group evaluates once
        match &self.nodes[id].kind {
            NodeKind::Paren { inner: Some(_), .. } => return Ok(()),
            NodeKind::Paren { .. } => {}
            _ => {
                return Err(TranspileError::MalformedSql(
                    "not a parenthesized group".to_string(),
                ));
            }
        }

        let ops = match &mut self.nodes[id].kind {
            NodeKind::Paren { ops, .. } => std::mem::take(ops),
            _ => Vec::new(),
        };
        if ops.is_empty() {
            return Err(TranspileError::MalformedSql(
                "empty predicate group".to_string(),
            ));
        }

        let mut last = None;
        for op in ops {
            self.evaluate_op(op)?;
            last = Some(op);
        }

        if let NodeKind::Paren { inner, .. } = &mut self.nodes[id].kind {
            *inner = last;
        }
        Ok(())
    }

    fn is_bool(&self, id: NodeId) -> bool {
        matches!(
            self.nodes[id].kind,
            NodeKind::And { .. } | NodeKind::Or { .. }
        )
    }

    fn is_paren(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Paren { .. })
    }

    fn evaluate_op(&mut self, id: NodeId) -> TranspileResult<()> {
        if self.is_bool(id) {
            self.evaluate_bool(id)
        } else if matches!(self.nodes[id].kind, NodeKind::Not) {
            self.evaluate_not(id)
        } else if self.is_paren(id) {
            self.evaluate_paren(id)
        } else {
            Ok(())
        }
    }

    fn evaluate_bool(&mut self, id: NodeId) -> TranspileResult<()> {
        let (Some(lhs), Some(rhs)) = (self.nodes[id].lhs, self.nodes[id].rhs) else {
            return Err(TranspileError::MalformedSql(
                "dangling boolean operator".to_string(),
            ));
        };
        let my_kind = self.bool_kind(id);

        // left neighbour
        if self.is_bool(lhs) {
            if self.bool_kind(lhs) == my_kind {
                let mut merged = self.take_acc(lhs);
                let acc = self.acc_mut(id)?;
                merged.append(acc);
                *acc = merged;
            } else {
                self.acc_mut(id)?.insert(0, lhs);
            }
        } else if self.is_paren(lhs) {
            self.evaluate_paren(lhs)?;
            self.acc_mut(id)?.push(lhs);
        } else {
            self.acc_mut(id)?.push(lhs);
        }

        // right neighbour
        if self.is_bool(rhs) {
            if self.bool_kind(rhs) == my_kind {
                let merged = self.take_acc(rhs);
                self.acc_mut(id)?.extend(merged);
            } else {
                self.acc_mut(id)?.push(rhs);
            }
        } else if self.is_paren(rhs) {
            self.evaluate_paren(rhs)?;
            self.acc_mut(id)?.push(rhs);
        } else {
            self.acc_mut(id)?.push(rhs);
        }

        // rewire the outer chain around the absorbed neighbours
        if let Some(outer_left) = self.nodes[lhs].lhs {
            self.nodes[outer_left].rhs = Some(id);
        }
        if let Some(outer_right) = self.nodes[rhs].rhs {
            self.nodes[outer_right].lhs = Some(id);
        }
        Ok(())
    }

    fn evaluate_not(&mut self, id: NodeId) -> TranspileResult<()> {
        let rhs = self.nodes[id]
            .rhs
            .ok_or_else(|| TranspileError::MalformedSql("dangling NOT".to_string()))?;
        self.negate(rhs)?;
        if matches!(self.nodes[rhs].kind, NodeKind::Paren { .. }) {
            self.evaluate_paren(rhs)?;
        }
        // NOT drops out of the chain
        if let Some(lhs) = self.nodes[id].lhs {
            self.nodes[lhs].rhs = Some(rhs);
        }
        Ok(())
    }

    fn negate(&mut self, id: NodeId) -> TranspileResult<()> {
        enum Action {
            Mark,
            Distribute(Vec<NodeId>),
            RejectNot,
            RejectRoot,
        }

        let action = match &self.nodes[id].kind {
            NodeKind::Cmp { .. }
            | NodeKind::In { .. }
            | NodeKind::NotIn { .. }
            | NodeKind::And { .. }
            | NodeKind::Or { .. } => Action::Mark,
            NodeKind::Paren { ops, members, .. } => {
                Action::Distribute(ops.iter().chain(members.iter()).copied().collect())
            }
            NodeKind::Not => Action::RejectNot,
            NodeKind::WhereRoot { .. } => Action::RejectRoot,
        };

        match action {
            Action::Mark => {
                // an idempotent set, not a toggle: a lone comparison is
                // reachable through both lists of its group
                self.nodes[id].negated = true;
                Ok(())
            }
            Action::Distribute(targets) => {
                for target in targets {
                    self.negate(target)?;
                }
                Ok(())
            }
            Action::RejectNot => Err(TranspileError::Unsupported(
                "negating a NOT expression".to_string(),
            )),
            Action::RejectRoot => Err(TranspileError::MalformedSql(
                "cannot negate a WHERE root".to_string(),
            )),
        }
    }

    /// Emit the evaluated tree as a MongoDB filter document
    pub fn emit(&self, ectx: &EmitContext<'_>) -> TranspileResult<Document> {
        let filter = self.emit_node(self.root, ectx)?;
        debug!(filter = %filter, "emitted predicate tree");
        Ok(filter)
    }

    fn emit_node(&self, id: NodeId, ectx: &EmitContext<'_>) -> TranspileResult<Document> {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Cmp {
                field,
                operator,
                constant,
            } => {
                let key = ectx.field(field.qualifier.as_deref(), &field.column);
                let mut spec = Document::new();
                spec.insert(*operator, constant.clone());
                let mut out = Document::new();
                if node.negated {
                    out.insert(key, doc! { "$not": spec });
                } else {
                    out.insert(key, spec);
                }
                Ok(out)
            }
            NodeKind::In { field, values } => {
                self.emit_membership(node, field, values, false, ectx)
            }
            NodeKind::NotIn { field, values } => {
                self.emit_membership(node, field, values, true, ectx)
            }
            NodeKind::Not => {
                let rhs = node
                    .rhs
                    .ok_or_else(|| TranspileError::MalformedSql("dangling NOT".to_string()))?;
                self.emit_node(rhs, ectx)
            }
            NodeKind::And { acc } | NodeKind::Or { acc } => {
                let operator = match self.bool_kind(id) {
                    Some(BoolKind::And) => "$and",
                    _ => "$or",
                };
                let docs = acc
                    .iter()
                    .map(|child| self.emit_node(*child, ectx).map(Bson::Document))
                    .collect::<TranspileResult<Vec<Bson>>>()?;
                let mut out = Document::new();
                out.insert(operator, docs);
                Ok(out)
            }
            NodeKind::Paren { inner, .. } => {
                let inner = inner.ok_or_else(|| {
                    TranspileError::MalformedSql("unevaluated predicate group".to_string())
                })?;
                self.emit_node(inner, ectx)
            }
            NodeKind::WhereRoot { inner } => self.emit_node(*inner, ectx),
        }
    }

    fn emit_membership(
        &self,
        node: &Node,
        field: &FieldRef,
        values: &InList,
        not_in: bool,
        ectx: &EmitContext<'_>,
    ) -> TranspileResult<Document> {
        let operator = match (not_in, node.negated) {
            (false, false) | (true, true) => "$in",
            (false, true) | (true, false) => "$nin",
        };
        let list: Vec<Bson> = match values {
            InList::Literal(values) => values.clone(),
            InList::Nested => ectx
                .nested_result
                .ok_or_else(|| {
                    TranspileError::MalformedSql(
                        "nested subquery result not resolved".to_string(),
                    )
                })?
                .to_vec(),
        };
        let key = ectx.field(field.qualifier.as_deref(), &field.column);
        let mut spec = Document::new();
        spec.insert(operator, list);
        let mut out = Document::new();
        out.insert(key, spec);
        Ok(out)
    }
}

/// Construction-pass state: the arena plus the mutable query context
struct TreeBuilder<'a> {
    nodes: Vec<Node>,
    ctx: &'a mut QueryContext,
}

impl TreeBuilder<'_> {
    fn alloc(&mut self, kind: NodeKind, precedence: u8) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            negated: false,
            precedence,
            lhs: None,
            rhs: None,
        });
        id
    }

    fn link(&mut self, prev: Option<NodeId>, op: NodeId) {
        if let Some(prev) = prev {
            self.nodes[prev].rhs = Some(op);
            self.nodes[op].lhs = Some(prev);
        }
    }

    /// Insert into the group's operator list, highest precedence first;
    /// equal precedence keeps arrival order
    fn insert_by_precedence(&mut self, paren: NodeId, op: NodeId) {
        let precedence = self.nodes[op].precedence;
        let position = match &self.nodes[paren].kind {
            NodeKind::Paren { ops, .. } => ops
                .iter()
                .position(|&existing| self.nodes[existing].precedence < precedence),
            _ => None,
        };
        if let NodeKind::Paren { ops, .. } = &mut self.nodes[paren].kind {
            match position {
                Some(at) => ops.insert(at, op),
                None => ops.push(op),
            }
        }
    }

    fn add_member(&mut self, paren: NodeId, op: NodeId) {
        if let NodeKind::Paren { members, .. } = &mut self.nodes[paren].kind {
            members.push(op);
        }
    }

    fn push_op(&mut self, paren: NodeId, op: NodeId) {
        if let NodeKind::Paren { ops, .. } = &mut self.nodes[paren].kind {
            ops.push(op);
        }
    }

    /// A parenthesis that belongs to an IN list, a nested subquery or a
    /// value group rather than to the boolean structure
    fn is_value_group(token: &Token) -> bool {
        match token.token_next(0) {
            Some((_, first)) => {
                first.is_placeholder()
                    || first.is_keyword("NULL")
                    || first.is_group(GroupKind::IdentifierList)
                    || first.leaf_kind() == Some(TokenKind::Dml)
            }
            None => true,
        }
    }

    fn build_paren(&mut self, token: &Token) -> TranspileResult<NodeId> {
        let paren = self.alloc(
            NodeKind::Paren {
                ops: Vec::new(),
                members: Vec::new(),
                inner: None,
            },
            0,
        );

        let mut current: Option<NodeId> = None;
        let mut cursor = 0usize;

        while let Some((index, tok)) = token.token_next(cursor) {
            cursor = index;
            let prev = current;

            if tok.is_keyword("AND") {
                let op = self.alloc(NodeKind::And { acc: Vec::new() }, PREC_AND);
                self.link(prev, op);
                self.insert_by_precedence(paren, op);
                current = Some(op);
            } else if tok.is_keyword("OR") {
                let op = self.alloc(NodeKind::Or { acc: Vec::new() }, PREC_OR);
                self.link(prev, op);
                self.insert_by_precedence(paren, op);
                current = Some(op);
            } else if tok.is_keyword("IN") {
                let op = self.build_membership(token, index, index, false)?;
                self.link(prev, op);
                self.insert_by_precedence(paren, op);
                current = Some(op);
            } else if tok.is_keyword("NOT") {
                match token.token_next(index) {
                    Some((in_index, next)) if next.is_keyword("IN") => {
                        let op = self.build_membership(token, index, in_index, true)?;
                        cursor = in_index;
                        self.link(prev, op);
                        self.insert_by_precedence(paren, op);
                        current = Some(op);
                    }
                    _ => {
                        let op = self.alloc(NodeKind::Not, PREC_NOT);
                        self.link(prev, op);
                        self.insert_by_precedence(paren, op);
                        current = Some(op);
                    }
                }
            } else if tok.is_group(GroupKind::Comparison) {
                let op = self.build_cmp(tok)?;
                self.add_member(paren, op);
                self.link(prev, op);
                current = Some(op);
            } else if tok.is_group(GroupKind::Parenthesis) {
                if !Self::is_value_group(tok) {
                    let op = self.build_paren(tok)?;
                    self.add_member(paren, op);
                    self.link(prev, op);
                    current = Some(op);
                }
            } else if tok.is_punctuation(")") {
                if let Some(op) = current {
                    if self.nodes[op].lhs.is_none()
                        && matches!(self.nodes[op].kind, NodeKind::Cmp { .. })
                    {
                        self.push_op(paren, op);
                    }
                }
                break;
            }
            // identifiers ahead of IN and other atoms are passed over
        }

        Ok(paren)
    }

    /// Build an IN / NOT IN node from the identifier before the keyword
    /// and the value group after it
    fn build_membership(
        &mut self,
        parent: &Token,
        keyword_index: usize,
        values_after: usize,
        not_in: bool,
    ) -> TranspileResult<NodeId> {
        let (_, ident_tok) = parent.token_prev(keyword_index).ok_or_else(|| {
            TranspileError::MalformedSql("IN without a preceding identifier".to_string())
        })?;
        let field = field_ref(ident_tok)?;

        let (_, values_tok) = parent.token_next(values_after).ok_or_else(|| {
            TranspileError::MalformedSql("IN without a value list".to_string())
        })?;
        let values = self.fill_membership(values_tok)?;

        let kind = if not_in {
            NodeKind::NotIn { field, values }
        } else {
            NodeKind::In { field, values }
        };
        let precedence = if not_in { PREC_NOT_IN } else { PREC_IN };
        Ok(self.alloc(kind, precedence))
    }

    fn fill_membership(&mut self, values_tok: &Token) -> TranspileResult<InList> {
        if !values_tok.is_group(GroupKind::Parenthesis) {
            return Err(TranspileError::MalformedSql(format!(
                "IN expects a parenthesized list, found {}",
                values_tok.value()
            )));
        }

        // nested SELECT: re-parse the group body as its own statement
        if let Some((_, first)) = values_tok.token_next(0) {
            if first.leaf_kind() == Some(TokenKind::Dml) {
                let body = values_tok.value();
                let inner = &body[1..body.len() - 1];
                let mut statements = parse_sql(inner)?;
                let statement = statements.drain(..).next().ok_or_else(|| {
                    TranspileError::MalformedSql("empty nested subquery".to_string())
                })?;
                self.ctx.record_nested(statement)?;
                return Ok(InList::Nested);
            }
        }

        let ident = SqlIdent::new(values_tok, &self.ctx.aliases);
        let indices = ident.in_values()?;
        let mut values = Vec::with_capacity(indices.len());
        for index in indices {
            match index {
                Some(index) => values.push(self.ctx.param(index)?.clone()),
                None => values.push(Bson::Null),
            }
        }
        Ok(InList::Literal(values))
    }

    fn build_cmp(&mut self, token: &Token) -> TranspileResult<NodeId> {
        let left = token
            .comparison_left()
            .ok_or_else(|| TranspileError::MalformedSql(token.value()))?;
        let field = field_ref(left)?;

        let right = token
            .comparison_right()
            .ok_or_else(|| TranspileError::MalformedSql(token.value()))?;
        if right.is_group(GroupKind::Identifier) {
            return Err(TranspileError::JoinInWhere);
        }

        let operator_text = token
            .comparison_operator()
            .ok_or_else(|| TranspileError::MalformedSql(token.value()))?;
        let operator = match operator_text {
            "=" => "$eq",
            ">" => "$gt",
            "<" => "$lt",
            ">=" => "$gte",
            "<=" => "$lte",
            other => {
                return Err(TranspileError::Unsupported(format!(
                    "comparison operator {other}"
                )));
            }
        };

        let constant = if right.is_placeholder() {
            let text = right
                .text()
                .ok_or_else(|| TranspileError::PlaceholderSyntax(right.value()))?;
            let index = placeholder_index(text)
                .ok_or_else(|| TranspileError::PlaceholderSyntax(text.to_string()))?;
            self.ctx.param(index)?.clone()
        } else if right.is_keyword("NULL") {
            Bson::Null
        } else {
            return Err(TranspileError::PlaceholderSyntax(right.value()));
        };

        Ok(self.alloc(
            NodeKind::Cmp {
                field,
                operator,
                constant,
            },
            0,
        ))
    }
}

fn field_ref(token: &Token) -> TranspileResult<FieldRef> {
    if !token.is_group(GroupKind::Identifier) {
        return Err(TranspileError::MalformedIdentifier(token.value()));
    }
    let column = token
        .real_name()
        .ok_or_else(|| TranspileError::MalformedIdentifier(token.value()))?;
    Ok(FieldRef {
        qualifier: token.parent_name().map(String::from),
        column: column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use sql2mongo_tokenizer::number_placeholders;

    fn build_filter(where_sql: &str, params: Vec<Bson>) -> TranspileResult<Document> {
        let sql = number_placeholders(&format!("SELECT \"a\" FROM \"t\" {where_sql}"));
        let statements = parse_sql(&sql)?;
        let where_token = statements[0]
            .children()
            .iter()
            .find(|t| t.is_group(GroupKind::Where))
            .cloned()
            .ok_or_else(|| TranspileError::MalformedSql("no WHERE".into()))?;

        let mut ctx = QueryContext::new(params);
        ctx.left_table = Some("t".to_string());
        let tree = PredicateTree::build(&where_token, &mut ctx)?;
        let ectx = EmitContext {
            left_table: "t",
            aliases: &ctx.aliases,
            nested_result: None,
        };
        tree.emit(&ectx)
    }

    #[test]
    fn test_simple_comparison() {
        let filter = build_filter("WHERE \"x\" = %s", vec![Bson::Int32(5)]).unwrap();
        assert_eq!(filter, doc! { "x": { "$eq": 5 } });
    }

    #[test]
    fn test_lone_parenthesized_comparison() {
        let filter = build_filter("WHERE (\"x\" >= %s)", vec![Bson::Int32(9)]).unwrap();
        assert_eq!(filter, doc! { "x": { "$gte": 9 } });
    }

    #[test]
    fn test_and_flattens() {
        let filter = build_filter(
            "WHERE \"x\" = %s AND \"y\" = %s AND \"z\" = %s",
            vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)],
        )
        .unwrap();
        assert_eq!(
            filter,
            doc! { "$and": [
                { "x": { "$eq": 1 } },
                { "y": { "$eq": 2 } },
                { "z": { "$eq": 3 } },
            ]}
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let filter = build_filter(
            "WHERE \"a\" = %s AND \"b\" = %s OR \"c\" = %s",
            vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)],
        )
        .unwrap();
        assert_eq!(
            filter,
            doc! { "$or": [
                { "$and": [ { "a": { "$eq": 1 } }, { "b": { "$eq": 2 } } ] },
                { "c": { "$eq": 3 } },
            ]}
        );

        let filter = build_filter(
            "WHERE \"a\" = %s OR \"b\" = %s AND \"c\" = %s",
            vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)],
        )
        .unwrap();
        assert_eq!(
            filter,
            doc! { "$or": [
                { "a": { "$eq": 1 } },
                { "$and": [ { "b": { "$eq": 2 } }, { "c": { "$eq": 3 } } ] },
            ]}
        );
    }

    #[test]
    fn test_join_in_where_rejected() {
        let err = build_filter("WHERE \"x\" = \"y\"", Vec::new()).unwrap_err();
        assert_eq!(err, TranspileError::JoinInWhere);
    }

    #[test]
    fn test_membership_with_nulls() {
        let filter = build_filter(
            "WHERE \"x\" IN (%s, NULL, %s)",
            vec![Bson::Int32(1), Bson::Int32(2)],
        )
        .unwrap();
        assert_eq!(
            filter,
            doc! { "x": { "$in": [Bson::Int32(1), Bson::Null, Bson::Int32(2)] } }
        );
    }

    #[test]
    fn test_parameter_out_of_range() {
        let err = build_filter("WHERE \"x\" = %s", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            TranspileError::ParameterIndex {
                index: 0,
                available: 0
            }
        );
    }
}
