//! Recursive-descent parser producing the concrete syntax tree.
//! No semantic interpretation happens here beyond what the grammar itself
//! decides -- that is the visitor's job.

use crate::cst::{CstNode, Rule};
use crate::error::{CompileError, ParseError, SourceSpan};
use crate::lexer::{Keyword, Spanned, Token};

mod expressions;
mod statements;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &'a Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &'a Token {
        &self.cur().token
    }

    /// Token `n` positions past the current one (clamped to `Eof`).
    fn peek_nth(&self, n: usize) -> &'a Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn cur_span(&self) -> SourceSpan {
        self.cur().span
    }

    fn advance(&mut self) -> Spanned {
        let t = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, expected: &str) -> CompileError {
        let cur = self.cur();
        let found = match &cur.token {
            Token::Eof => "end of input".to_owned(),
            _ => format!("'{}'", cur.image),
        };
        CompileError::Parse(ParseError::new(
            format!("expected {}, found {}", expected, found),
            cur.span,
        ))
    }

    fn is_keyword(&self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    /// Consume a token equal to `expected`, or fail naming `what`.
    fn expect(&mut self, expected: &Token, what: &str) -> Result<Spanned, CompileError> {
        if self.peek() == expected {
            Ok(self.advance())
        } else {
            Err(self.err(what))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<Spanned, CompileError> {
        if self.is_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(self.err(&format!("'{}'", kw.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> Result<Spanned, CompileError> {
        if matches!(self.peek(), Token::Identifier(_)) {
            Ok(self.advance())
        } else {
            Err(self.err("identifier"))
        }
    }

    // -- Top level ----------------------------------------------

    fn parse_program(&mut self) -> Result<CstNode, CompileError> {
        let mut program = CstNode::new(Rule::Program, self.cur_span());
        while self.peek() != &Token::Eof {
            let def = self.parse_subworkflow_definition()?;
            program.push_node("subworkflowDefinition", def);
        }
        Ok(program)
    }

    fn parse_subworkflow_definition(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::SubworkflowDefinition, self.cur_span());
        if !self.is_keyword(Keyword::Workflow) {
            return Err(self.err("'workflow'"));
        }
        node.push_token("Workflow", self.advance());
        node.push_token("Identifier", self.expect_identifier()?);
        self.expect(&Token::LParen, "'('")?;
        let params = self.parse_formal_parameter_list()?;
        node.push_node("formalParameterList", params);
        self.expect(&Token::RParen, "')'")?;
        self.expect(&Token::LBrace, "'{'")?;
        let block = self.parse_statement_block()?;
        node.push_node("statementBlock", block);
        self.expect(&Token::RBrace, "'}'")?;
        Ok(node)
    }

    fn parse_formal_parameter_list(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::FormalParameterList, self.cur_span());
        if self.peek() == &Token::RParen {
            return Ok(node);
        }
        loop {
            let mut param = CstNode::new(Rule::FormalParameter, self.cur_span());
            param.push_token("Identifier", self.expect_identifier()?);
            if self.peek() == &Token::Assign {
                self.advance();
                let literal = self.parse_literal()?;
                param.push_node("literal", literal);
            }
            node.push_node("formalParameter", param);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(node)
    }
}

/// Parse a token stream into a `Program` CST node.
pub fn parse(tokens: &[Spanned]) -> Result<CstNode, CompileError> {
    match tokens.last() {
        None => {
            return Err(CompileError::Parse(ParseError::new(
                "empty token stream",
                SourceSpan::default(),
            )))
        }
        Some(last) if last.token != Token::Eof => {
            return Err(CompileError::Parse(ParseError::new(
                "token stream does not end with end of input",
                last.span,
            )))
        }
        Some(_) => {}
    }
    let mut p = Parser::new(tokens);
    let program = p.parse_program()?;
    tracing::debug!(
        subworkflows = program.nodes("subworkflowDefinition").count(),
        "parsed program"
    );
    Ok(program)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
