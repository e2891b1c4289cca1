use super::Parser;
use crate::cst::{CstNode, Rule};
use crate::error::{CompileError, PostParsingError};
use crate::lexer::{Keyword, Token};

impl<'a> Parser<'a> {
    /// statementBlock := statement*  (up to the closing brace, not consumed)
    pub(super) fn parse_statement_block(&mut self) -> Result<CstNode, CompileError> {
        let mut block = CstNode::new(Rule::StatementBlock, self.cur_span());
        while self.peek() != &Token::RBrace && self.peek() != &Token::Eof {
            let statement = self.parse_statement()?;
            block.push_node("statement", statement);
        }
        Ok(block)
    }

    /// `{` statementBlock `}`
    fn parse_braced_block(&mut self) -> Result<CstNode, CompileError> {
        self.expect(&Token::LBrace, "'{'")?;
        let block = self.parse_statement_block()?;
        self.expect(&Token::RBrace, "'}'")?;
        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<CstNode, CompileError> {
        match self.peek() {
            Token::Identifier(_) => self.parse_call_or_assignment(),
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::For) => self.parse_for(),
            Token::Keyword(Keyword::Parallel) => self.parse_parallel(),
            Token::Keyword(Keyword::Try) => self.parse_try(),
            Token::Keyword(Keyword::Throw) => {
                let mut node = CstNode::new(Rule::ThrowStatement, self.cur_span());
                node.push_token("Throw", self.advance());
                let value = self.parse_expression()?;
                node.push_node("expression", value);
                Ok(node)
            }
            Token::Keyword(Keyword::Break) => {
                let mut node = CstNode::new(Rule::BreakStatement, self.cur_span());
                node.push_token("Break", self.advance());
                Ok(node)
            }
            Token::Keyword(Keyword::Continue) => {
                let mut node = CstNode::new(Rule::ContinueStatement, self.cur_span());
                node.push_token("Continue", self.advance());
                Ok(node)
            }
            Token::Keyword(Keyword::Return) => {
                let mut node = CstNode::new(Rule::ReturnStatement, self.cur_span());
                node.push_token("Return", self.advance());
                if self.can_start_expression() {
                    let value = self.parse_expression()?;
                    node.push_node("expression", value);
                }
                Ok(node)
            }
            _ => Err(self.err("statement")),
        }
    }

    /// The reference is parsed once; the next token decides between an
    /// assignment (`=`) and a bare call (`(`).
    fn parse_call_or_assignment(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::CallOrAssignmentStatement, self.cur_span());
        let (reference, subscripted) = self.parse_variable_reference()?;

        match self.peek() {
            Token::Assign => {
                node.push_node("variableReference", reference);
                node.push_token("Assign", self.advance());
                if self.named_call_ahead().is_some() {
                    let call = self.parse_named_call()?;
                    node.push_node("namedCall", call);
                } else {
                    let value = self.parse_expression()?;
                    node.push_node("expression", value);
                }
            }
            Token::LParen => {
                if subscripted {
                    return Err(self.err("a function name without subscripts before '('"));
                }
                node.push_node("qualifiedName", Self::qualified_name_of(&reference));
                if self.named_arguments_ahead() {
                    self.advance();
                    let args = self.parse_actual_named_parameter_list()?;
                    node.push_node("actualNamedParameterList", args);
                } else {
                    self.advance();
                    if self.peek() != &Token::RParen {
                        let args = self.parse_actual_parameter_list()?;
                        node.push_node("actualParameterList", args);
                    }
                }
                self.expect(&Token::RParen, "')'")?;
            }
            _ => return Err(self.err("'=' or '('")),
        }
        Ok(node)
    }

    fn parse_parenthesized_condition(&mut self, node: &mut CstNode) -> Result<(), CompileError> {
        self.expect(&Token::LParen, "'('")?;
        let condition = self.parse_expression()?;
        node.push_node("expression", condition);
        self.expect(&Token::RParen, "')'")?;
        Ok(())
    }

    /// ifStatement := "if" "(" expr ")" block ("else" "if" "(" expr ")" block)* ("else" block)?
    fn parse_if(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::IfStatement, self.cur_span());
        node.push_token("If", self.expect_keyword(Keyword::If)?);
        self.parse_parenthesized_condition(&mut node)?;
        let block = self.parse_braced_block()?;
        node.push_node("statementBlock", block);

        while self.is_keyword(Keyword::Else) {
            node.push_token("Else", self.advance());
            if self.is_keyword(Keyword::If) {
                node.push_token("If", self.advance());
                self.parse_parenthesized_condition(&mut node)?;
                let block = self.parse_braced_block()?;
                node.push_node("statementBlock", block);
            } else {
                let block = self.parse_braced_block()?;
                node.push_node("statementBlock", block);
                break;
            }
        }
        Ok(node)
    }

    /// forStatement := "for" "(" Identifier "in" expression ")" block
    pub(super) fn parse_for(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::ForStatement, self.cur_span());
        node.push_token("For", self.expect_keyword(Keyword::For)?);
        self.expect(&Token::LParen, "'('")?;
        node.push_token("Identifier", self.expect_identifier()?);
        self.expect_keyword(Keyword::In)?;
        let iterable = self.parse_expression()?;
        node.push_node("expression", iterable);
        self.expect(&Token::RParen, "')'")?;
        let block = self.parse_braced_block()?;
        node.push_node("statementBlock", block);
        Ok(node)
    }

    /// parallelStatement := "parallel" ("(" namedParams ")")? (("branch" block)+ | forStatement)
    fn parse_parallel(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::ParallelStatement, self.cur_span());
        node.push_token("Parallel", self.expect_keyword(Keyword::Parallel)?);
        if self.peek() == &Token::LParen {
            self.advance();
            let params = self.parse_actual_named_parameter_list()?;
            node.push_node("actualNamedParameterList", params);
            self.expect(&Token::RParen, "')'")?;
        }

        if self.is_keyword(Keyword::For) {
            let for_node = self.parse_for()?;
            node.push_node("forStatement", for_node);
            return Ok(node);
        }

        if !self.is_keyword(Keyword::Branch) {
            return Err(self.err("'branch' or 'for'"));
        }
        while self.is_keyword(Keyword::Branch) {
            node.push_token("Branch", self.advance());
            let block = self.parse_braced_block()?;
            node.push_node("statementBlock", block);
        }
        Ok(node)
    }

    /// tryStatement := "try" block ("retry" "(" namedParams ")")? ("catch" "(" Identifier ")" block)?
    fn parse_try(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::TryStatement, self.cur_span());
        let try_token = self.expect_keyword(Keyword::Try)?;
        let try_span = try_token.span;
        node.push_token("Try", try_token);
        let body = self.parse_braced_block()?;
        node.push_node("tryBlock", body);

        if self.is_keyword(Keyword::Retry) {
            node.push_token("Retry", self.advance());
            self.expect(&Token::LParen, "'('")?;
            let params = self.parse_actual_named_parameter_list()?;
            node.push_node("actualNamedParameterList", params);
            self.expect(&Token::RParen, "')'")?;
        }

        if self.is_keyword(Keyword::Catch) {
            node.push_token("Catch", self.advance());
            self.expect(&Token::LParen, "'('")?;
            node.push_token("Identifier", self.expect_identifier()?);
            self.expect(&Token::RParen, "')'")?;
            let handler = self.parse_braced_block()?;
            node.push_node("catchBlock", handler);
        }

        if !node.has("Retry") && !node.has("Catch") {
            return Err(CompileError::PostParsing(PostParsingError::new(
                "A try statement must have a retry clause, a catch clause, or both",
                Some(try_span),
            )));
        }
        Ok(node)
    }
}
