use super::Parser;
use crate::cst::{CstNode, Rule};
use crate::error::CompileError;
use crate::lexer::{Keyword, Token};

impl<'a> Parser<'a> {
    // -- Literal parsing ----------------------------------------

    pub(super) fn parse_literal(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::Literal, self.cur_span());
        match self.peek() {
            Token::Str(_)
            | Token::Number(_)
            | Token::Keyword(Keyword::True)
            | Token::Keyword(Keyword::False)
            | Token::Keyword(Keyword::Null) => {
                node.push_token("value", self.advance());
                Ok(node)
            }
            _ => Err(self.err("literal")),
        }
    }

    fn at_literal(&self) -> bool {
        matches!(
            self.peek(),
            Token::Str(_)
                | Token::Number(_)
                | Token::Keyword(Keyword::True)
                | Token::Keyword(Keyword::False)
                | Token::Keyword(Keyword::Null)
        )
    }

    /// True if the current token can begin an expression.
    pub(super) fn can_start_expression(&self) -> bool {
        self.at_literal()
            || self.peek().is_unary_operator()
            || matches!(
                self.peek(),
                Token::Identifier(_)
                    | Token::ExprLiteral(_)
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
            )
    }

    // -- Expression parsing --------------------------------------

    /// expression := term (binaryOperator term)*
    pub(super) fn parse_expression(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::Expression, self.cur_span());
        let term = self.parse_term()?;
        node.push_node("term", term);
        while self.peek().is_binary_operator() {
            node.push_token("binaryOperator", self.advance());
            let term = self.parse_term()?;
            node.push_node("term", term);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::Term, self.cur_span());
        if self.peek().is_unary_operator() {
            node.push_token("unaryOperator", self.advance());
        }

        if self.at_literal() {
            let literal = self.parse_literal()?;
            node.push_node("literal", literal);
            return Ok(node);
        }

        match self.peek() {
            Token::LBracket => {
                let array = self.parse_array()?;
                node.push_node("array", array);
            }
            Token::LBrace => {
                let object = self.parse_object()?;
                node.push_node("object", object);
            }
            Token::LParen => {
                node.push_token("LParen", self.advance());
                let inner = self.parse_expression()?;
                node.push_node("expression", inner);
                self.expect(&Token::RParen, "')'")?;
            }
            Token::ExprLiteral(_) => {
                node.push_token("ExpressionLiteral", self.advance());
            }
            Token::Identifier(_) => {
                let (reference, subscripted) = self.parse_variable_reference()?;
                if self.peek() == &Token::LParen {
                    if subscripted {
                        return Err(self.err("a function name without subscripts before '('"));
                    }
                    let call = self.parse_call_expression_tail(&reference)?;
                    node.push_node("callExpression", call);
                } else {
                    node.push_node("variableReference", reference);
                }
            }
            _ => return Err(self.err("expression")),
        }
        Ok(node)
    }

    fn parse_array(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::Array, self.cur_span());
        self.expect(&Token::LBracket, "'['")?;
        if self.peek() != &Token::RBracket {
            loop {
                let element = self.parse_expression()?;
                node.push_node("expression", element);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(node)
    }

    fn parse_object(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::Object, self.cur_span());
        self.expect(&Token::LBrace, "'{'")?;
        if self.peek() != &Token::RBrace {
            loop {
                match self.peek() {
                    Token::Str(_) | Token::Identifier(_) => {
                        node.push_token("key", self.advance());
                    }
                    _ => return Err(self.err("object key")),
                }
                self.expect(&Token::Colon, "':'")?;
                let value = self.parse_expression()?;
                node.push_node("expression", value);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(node)
    }

    // -- References and calls ------------------------------------

    /// variableReference := subscriptReference ("." subscriptReference)*
    ///
    /// Also reports whether any part carried a subscript, so callers can
    /// tell a plain qualified name from a general reference.
    pub(super) fn parse_variable_reference(&mut self) -> Result<(CstNode, bool), CompileError> {
        let mut node = CstNode::new(Rule::VariableReference, self.cur_span());
        let mut subscripted = false;
        loop {
            let mut part = CstNode::new(Rule::SubscriptReference, self.cur_span());
            part.push_token("Identifier", self.expect_identifier()?);
            while self.peek() == &Token::LBracket {
                self.advance();
                let subscript = self.parse_expression()?;
                part.push_node("subscript", subscript);
                self.expect(&Token::RBracket, "']'")?;
                subscripted = true;
            }
            node.push_node("subscriptReference", part);
            if self.peek() == &Token::Dot {
                self.advance();
            } else {
                break;
            }
        }
        Ok((node, subscripted))
    }

    /// Rebuild an unsubscripted variable reference as a qualified name.
    pub(super) fn qualified_name_of(reference: &CstNode) -> CstNode {
        let mut name = CstNode::new(Rule::QualifiedName, reference.span);
        for part in reference.nodes("subscriptReference") {
            for ident in part.tokens("Identifier") {
                name.push_token("Identifier", ident.clone());
            }
        }
        name
    }

    /// Parse `"(" positional-arguments? ")"` after an already-parsed name.
    fn parse_call_expression_tail(&mut self, reference: &CstNode) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::CallExpression, reference.span);
        node.push_node("qualifiedName", Self::qualified_name_of(reference));
        self.expect(&Token::LParen, "'('")?;
        if self.peek() != &Token::RParen {
            let args = self.parse_actual_parameter_list()?;
            node.push_node("actualParameterList", args);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(node)
    }

    pub(super) fn parse_actual_parameter_list(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::ActualParameterList, self.cur_span());
        loop {
            let arg = self.parse_expression()?;
            node.push_node("expression", arg);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// actualNamedParameterList := Identifier "=" expression ("," Identifier "=" expression)*
    pub(super) fn parse_actual_named_parameter_list(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::ActualNamedParameterList, self.cur_span());
        loop {
            node.push_token("Identifier", self.expect_identifier()?);
            self.expect(&Token::Assign, "'='")?;
            let value = self.parse_expression()?;
            node.push_node("expression", value);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// True when the tokens right after the current `(` start a named
    /// argument (`Identifier "="`).
    pub(super) fn named_arguments_ahead(&self) -> bool {
        matches!(self.peek_nth(1), Token::Identifier(_)) && self.peek_nth(2) == &Token::Assign
    }

    /// Looks past `qualifiedName "("` for an empty or named argument list.
    /// Returns the number of name tokens (identifiers and dots) when found.
    /// An empty call followed by a binary operator is an expression term.
    pub(super) fn named_call_ahead(&self) -> Option<usize> {
        let mut n = 0;
        loop {
            if !matches!(self.peek_nth(n), Token::Identifier(_)) {
                return None;
            }
            n += 1;
            if self.peek_nth(n) == &Token::Dot {
                n += 1;
            } else {
                break;
            }
        }
        if self.peek_nth(n) != &Token::LParen {
            return None;
        }
        let after = self.peek_nth(n + 1);
        let named = match after {
            Token::RParen => !self.peek_nth(n + 2).is_binary_operator(),
            Token::Identifier(_) => self.peek_nth(n + 2) == &Token::Assign,
            _ => false,
        };
        named.then_some(n)
    }

    /// namedCall := qualifiedName "(" actualNamedParameterList? ")"
    pub(super) fn parse_named_call(&mut self) -> Result<CstNode, CompileError> {
        let mut node = CstNode::new(Rule::NamedCall, self.cur_span());
        let mut name = CstNode::new(Rule::QualifiedName, self.cur_span());
        loop {
            name.push_token("Identifier", self.expect_identifier()?);
            if self.peek() == &Token::Dot {
                self.advance();
            } else {
                break;
            }
        }
        node.push_node("qualifiedName", name);
        self.expect(&Token::LParen, "'('")?;
        if self.peek() != &Token::RParen {
            let args = self.parse_actual_named_parameter_list()?;
            node.push_node("actualNamedParameterList", args);
        }
        self.expect(&Token::RParen, "')'")?;
        if self.peek().is_binary_operator() {
            return Err(self.err(
                "end of statement (a call with named arguments cannot be part of an expression)",
            ));
        }
        Ok(node)
    }
}
