//! Concrete syntax tree: the grammar-shaped output of the parser.
//!
//! Each node records the rule that produced it and its children grouped by
//! named slot, in source order within a slot. The tree only lives between
//! parsing and the CST-to-AST visitor.

use crate::error::{InternalParsingError, SourceSpan};
use crate::lexer::Spanned;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Program,
    SubworkflowDefinition,
    FormalParameterList,
    FormalParameter,
    StatementBlock,
    CallOrAssignmentStatement,
    NamedCall,
    IfStatement,
    ForStatement,
    ParallelStatement,
    TryStatement,
    ThrowStatement,
    BreakStatement,
    ContinueStatement,
    ReturnStatement,
    Expression,
    Term,
    Literal,
    Array,
    Object,
    CallExpression,
    QualifiedName,
    VariableReference,
    SubscriptReference,
    ActualParameterList,
    ActualNamedParameterList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstElement {
    Node(CstNode),
    Token(Spanned),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstNode {
    pub rule: Rule,
    /// Position of the first token of the node
    pub span: SourceSpan,
    children: BTreeMap<&'static str, Vec<CstElement>>,
}

impl CstNode {
    pub fn new(rule: Rule, span: SourceSpan) -> Self {
        CstNode {
            rule,
            span,
            children: BTreeMap::new(),
        }
    }

    pub fn push_node(&mut self, slot: &'static str, node: CstNode) {
        self.children
            .entry(slot)
            .or_default()
            .push(CstElement::Node(node));
    }

    pub fn push_token(&mut self, slot: &'static str, token: Spanned) {
        self.children
            .entry(slot)
            .or_default()
            .push(CstElement::Token(token));
    }

    pub fn has(&self, slot: &str) -> bool {
        self.children.get(slot).is_some_and(|c| !c.is_empty())
    }

    /// All child nodes in `slot`, in source order.
    pub fn nodes<'a>(&'a self, slot: &str) -> impl Iterator<Item = &'a CstNode> + 'a {
        self.children
            .get(slot)
            .into_iter()
            .flatten()
            .filter_map(|e| match e {
                CstElement::Node(n) => Some(n),
                CstElement::Token(_) => None,
            })
    }

    /// All child tokens in `slot`, in source order.
    pub fn tokens<'a>(&'a self, slot: &str) -> impl Iterator<Item = &'a Spanned> + 'a {
        self.children
            .get(slot)
            .into_iter()
            .flatten()
            .filter_map(|e| match e {
                CstElement::Token(t) => Some(t),
                CstElement::Node(_) => None,
            })
    }

    pub fn node(&self, slot: &str) -> Option<&CstNode> {
        self.nodes(slot).next()
    }

    pub fn token(&self, slot: &str) -> Option<&Spanned> {
        self.tokens(slot).next()
    }

    pub fn required_node(&self, slot: &str) -> Result<&CstNode, InternalParsingError> {
        self.node(slot).ok_or_else(|| {
            InternalParsingError(format!("{:?} node has no '{}' child", self.rule, slot))
        })
    }

    pub fn required_token(&self, slot: &str) -> Result<&Spanned, InternalParsingError> {
        self.token(slot).ok_or_else(|| {
            InternalParsingError(format!("{:?} node has no '{}' token", self.rule, slot))
        })
    }

    /// Check that this node was produced by `rule`.
    pub fn expect_rule(&self, rule: Rule) -> Result<(), InternalParsingError> {
        if self.rule == rule {
            Ok(())
        } else {
            Err(InternalParsingError(format!(
                "expected a {:?} node, found {:?}",
                rule, self.rule
            )))
        }
    }
}
