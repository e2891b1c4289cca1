use super::{object_key, post_parsing, Visitor};
use crate::ast::expressions::quote;
use crate::ast::*;
use crate::cst::{CstNode, Rule};
use crate::error::{CompileError, InternalParsingError, SourceSpan};
use crate::lexer::{Keyword, Spanned, Token};
use serde_json::Value;

/// A named argument or option as written: `name = expression`.
pub(super) struct NamedArgument {
    pub name: String,
    pub value: Expression,
    pub span: SourceSpan,
}

impl Visitor {
    pub(super) fn visit_literal(&mut self, node: &CstNode) -> Result<Primitive, CompileError> {
        node.expect_rule(Rule::Literal)?;
        let token = node.required_token("value")?;
        let primitive = match &token.token {
            Token::Str(s) => Primitive::Str(s.clone()),
            Token::Number(n) => Primitive::Number(*n),
            Token::Keyword(Keyword::True) => Primitive::Bool(true),
            Token::Keyword(Keyword::False) => Primitive::Bool(false),
            Token::Keyword(Keyword::Null) => Primitive::Null,
            other => {
                return Err(InternalParsingError(format!("'{}' is not a literal", other)).into())
            }
        };
        Ok(primitive)
    }

    pub(super) fn visit_expression(&mut self, node: &CstNode) -> Result<Expression, CompileError> {
        node.expect_rule(Rule::Expression)?;
        let mut terms = node.nodes("term");
        let first = terms
            .next()
            .ok_or_else(|| InternalParsingError("expression without terms".to_owned()))?;
        let left = self.visit_term(first)?;

        let operators: Vec<&Spanned> = node.tokens("binaryOperator").collect();
        let terms: Vec<&CstNode> = terms.collect();
        if operators.len() != terms.len() {
            return Err(InternalParsingError(format!(
                "expression has {} operators for {} trailing terms",
                operators.len(),
                terms.len()
            ))
            .into());
        }

        let mut rest = Vec::with_capacity(terms.len());
        for (op, term) in operators.into_iter().zip(terms) {
            rest.push((binary_operator(op)?, self.visit_term(term)?));
        }
        Ok(Expression { left, rest })
    }

    fn visit_term(&mut self, node: &CstNode) -> Result<Term, CompileError> {
        node.expect_rule(Rule::Term)?;
        let unary = node.token("unaryOperator").map(unary_operator).transpose()?;

        let value = if let Some(literal) = node.node("literal") {
            TermValue::Primitive(self.visit_literal(literal)?)
        } else if let Some(array) = node.node("array") {
            TermValue::List(self.visit_array(array)?)
        } else if let Some(object) = node.node("object") {
            TermValue::Map(self.visit_object(object)?)
        } else if node.has("LParen") {
            let inner = self.visit_expression(node.required_node("expression")?)?;
            TermValue::Parenthesized(Box::new(inner))
        } else if let Some(token) = node.token("ExpressionLiteral") {
            match &token.token {
                Token::ExprLiteral(text) => TermValue::Variable(text.clone()),
                other => {
                    return Err(InternalParsingError(format!(
                        "'{}' is not an expression literal",
                        other
                    ))
                    .into())
                }
            }
        } else if let Some(call) = node.node("callExpression") {
            TermValue::Call(self.visit_call_expression(call)?)
        } else if let Some(reference) = node.node("variableReference") {
            TermValue::Variable(self.visit_variable_reference(reference)?)
        } else {
            return Err(InternalParsingError("term has no value".to_owned()).into());
        };
        Ok(Term { unary, value })
    }

    fn visit_array(&mut self, node: &CstNode) -> Result<Vec<Expression>, CompileError> {
        node.expect_rule(Rule::Array)?;
        node.nodes("expression")
            .map(|e| self.visit_expression(e))
            .collect()
    }

    /// Object keys keep first-seen order; a repeated key takes the later value.
    fn visit_object(&mut self, node: &CstNode) -> Result<Vec<(String, Expression)>, CompileError> {
        node.expect_rule(Rule::Object)?;
        let keys: Vec<&Spanned> = node.tokens("key").collect();
        let values: Vec<&CstNode> = node.nodes("expression").collect();
        if keys.len() != values.len() {
            return Err(InternalParsingError("object keys and values differ in count".to_owned()).into());
        }

        let mut entries: Vec<(String, Expression)> = Vec::with_capacity(keys.len());
        for (key, value) in keys.into_iter().zip(values) {
            let key = object_key(key);
            let value = self.visit_expression(value)?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(entries)
    }

    fn visit_call_expression(&mut self, node: &CstNode) -> Result<FunctionInvocation, CompileError> {
        node.expect_rule(Rule::CallExpression)?;
        let name = self.visit_qualified_name(node.required_node("qualifiedName")?)?;
        let args = match node.node("actualParameterList") {
            Some(list) => self.visit_actual_parameter_list(list)?,
            None => Vec::new(),
        };
        Ok(FunctionInvocation { name, args })
    }

    pub(super) fn visit_qualified_name(&mut self, node: &CstNode) -> Result<String, CompileError> {
        node.expect_rule(Rule::QualifiedName)?;
        let parts: Vec<&str> = node.tokens("Identifier").map(|t| t.image.as_str()).collect();
        if parts.is_empty() {
            return Err(InternalParsingError("empty qualified name".to_owned()).into());
        }
        Ok(parts.join("."))
    }

    /// Joins every accessor into one name, e.g. `a.b[0]["c"][i + 1]`.
    pub(super) fn visit_variable_reference(&mut self, node: &CstNode) -> Result<String, CompileError> {
        node.expect_rule(Rule::VariableReference)?;
        let mut parts = Vec::new();
        for part in node.nodes("subscriptReference") {
            parts.push(self.visit_subscript_reference(part)?);
        }
        if parts.is_empty() {
            return Err(InternalParsingError("empty variable reference".to_owned()).into());
        }
        Ok(parts.join("."))
    }

    fn visit_subscript_reference(&mut self, node: &CstNode) -> Result<String, CompileError> {
        node.expect_rule(Rule::SubscriptReference)?;
        let mut text = node.required_token("Identifier")?.image.clone();
        for subscript in node.nodes("subscript") {
            let expression = self.visit_expression(subscript)?;
            text.push('[');
            text.push_str(&subscript_text(&expression, subscript.span)?);
            text.push(']');
        }
        Ok(text)
    }

    pub(super) fn visit_actual_parameter_list(
        &mut self,
        node: &CstNode,
    ) -> Result<Vec<Expression>, CompileError> {
        node.expect_rule(Rule::ActualParameterList)?;
        node.nodes("expression")
            .map(|e| self.visit_expression(e))
            .collect()
    }

    pub(super) fn visit_actual_named_parameter_list(
        &mut self,
        node: &CstNode,
    ) -> Result<Vec<NamedArgument>, CompileError> {
        node.expect_rule(Rule::ActualNamedParameterList)?;
        let names: Vec<&Spanned> = node.tokens("Identifier").collect();
        let values: Vec<&CstNode> = node.nodes("expression").collect();
        if names.len() != values.len() {
            return Err(InternalParsingError("named parameters and values differ in count".to_owned()).into());
        }
        names
            .into_iter()
            .zip(values)
            .map(|(name, value)| {
                Ok(NamedArgument {
                    name: name.image.clone(),
                    value: self.visit_expression(value)?,
                    span: name.span,
                })
            })
            .collect()
    }

    /// Call arguments as assignments; a name may be given only once.
    pub(super) fn call_arguments(
        &mut self,
        node: Option<&CstNode>,
    ) -> Result<Assignments, CompileError> {
        let Some(node) = node else {
            return Ok(Vec::new());
        };
        let mut args: Assignments = Vec::new();
        for arg in self.visit_actual_named_parameter_list(node)? {
            if args.iter().any(|(name, _)| *name == arg.name) {
                return Err(post_parsing(
                    format!("Duplicate argument '{}'", arg.name),
                    arg.span,
                ));
            }
            args.push((arg.name, arg.value));
        }
        Ok(args)
    }
}

/// Text of one subscript: literal integers as-is, literal strings quoted,
/// anything non-literal as its expression text.
fn subscript_text(expression: &Expression, span: SourceSpan) -> Result<String, CompileError> {
    if !expression.is_literal() {
        return Ok(expression.to_string());
    }
    match expression.to_literal_value_or_literal_expression() {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i.to_string()),
            None => Err(post_parsing("Subscript can't be a float", span)),
        },
        Value::String(s) => Ok(quote(&s)),
        _ => Err(post_parsing("Subscript must be an integer or a string", span)),
    }
}

fn binary_operator(token: &Spanned) -> Result<BinaryOperator, CompileError> {
    let op = match &token.token {
        Token::Plus => BinaryOperator::Add,
        Token::Minus => BinaryOperator::Sub,
        Token::Star => BinaryOperator::Mul,
        Token::Slash => BinaryOperator::Div,
        Token::Percent => BinaryOperator::Rem,
        Token::Lt => BinaryOperator::Lt,
        Token::Lte => BinaryOperator::Lte,
        Token::Gt => BinaryOperator::Gt,
        Token::Gte => BinaryOperator::Gte,
        Token::Eq => BinaryOperator::Eq,
        Token::Neq => BinaryOperator::Neq,
        Token::Keyword(Keyword::And) => BinaryOperator::And,
        Token::Keyword(Keyword::Or) => BinaryOperator::Or,
        Token::Keyword(Keyword::In) => BinaryOperator::In,
        other => {
            return Err(InternalParsingError(format!("'{}' is not a binary operator", other)).into())
        }
    };
    Ok(op)
}

fn unary_operator(token: &Spanned) -> Result<UnaryOperator, CompileError> {
    match &token.token {
        Token::Minus => Ok(UnaryOperator::Minus),
        Token::Plus => Ok(UnaryOperator::Plus),
        Token::Keyword(Keyword::Not) => Ok(UnaryOperator::Not),
        other => Err(InternalParsingError(format!("'{}' is not a unary operator", other)).into()),
    }
}
