//! Expressions and their lowering to output values.
//!
//! An [`Expression`] is a flat `term (op term)*` sequence. Operator
//! precedence is never resolved here: the compiler only decides whether an
//! expression is a compile-time literal, and otherwise re-emits its text as a
//! `${...}` runtime expression for the workflow engine to evaluate.

use crate::lexer::Number;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    And,
    Or,
    In,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
}

impl Primitive {
    pub fn to_value(&self) -> Value {
        match self {
            Primitive::Null => Value::Null,
            Primitive::Bool(b) => Value::Bool(*b),
            Primitive::Number(n) => number_value(*n),
            Primitive::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => f.write_str("null"),
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Number(Number::Int(n)) => write!(f, "{}", n),
            Primitive::Number(Number::Float(x)) => write!(f, "{}", x),
            Primitive::Str(s) => f.write_str(&quote(s)),
        }
    }
}

pub(crate) fn number_value(n: Number) -> Value {
    match n {
        Number::Int(i) => Value::from(i),
        // The lexer only produces finite floats.
        Number::Float(x) => serde_json::Number::from_f64(x)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// JSON-quoted form of a string.
pub(crate) fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// A call used as a value: `name(arg, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInvocation {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermValue {
    Primitive(Primitive),
    List(Vec<Expression>),
    /// Insertion-ordered; keys are unique.
    Map(Vec<(String, Expression)>),
    /// A variable reference with all accessors joined into one name
    /// (`a.b[0]["c"]`), or the text of a `${...}` literal.
    Variable(String),
    Call(FunctionInvocation),
    Parenthesized(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub unary: Option<UnaryOperator>,
    pub value: TermValue,
}

impl Term {
    pub fn new(value: TermValue) -> Self {
        Term { unary: None, value }
    }

    pub fn is_literal(&self) -> bool {
        match (&self.unary, &self.value) {
            (Some(UnaryOperator::Not), _) => false,
            (Some(_), TermValue::Primitive(Primitive::Number(_))) => true,
            (Some(_), _) => false,
            (None, TermValue::Primitive(_)) => true,
            (None, TermValue::List(items)) => items.iter().all(Expression::is_literal),
            (None, TermValue::Map(entries)) => entries.iter().all(|(_, v)| v.is_literal()),
            (None, TermValue::Variable(_))
            | (None, TermValue::Call(_))
            | (None, TermValue::Parenthesized(_)) => false,
        }
    }

    pub fn to_literal_value_or_literal_expression(&self) -> Value {
        match (&self.unary, &self.value) {
            (None, TermValue::Primitive(p)) => p.to_value(),
            (Some(UnaryOperator::Plus), TermValue::Primitive(Primitive::Number(n))) => {
                number_value(*n)
            }
            (Some(UnaryOperator::Minus), TermValue::Primitive(Primitive::Number(n))) => {
                number_value(negate(*n))
            }
            (None, TermValue::List(items)) => Value::Array(
                items
                    .iter()
                    .map(Expression::to_literal_value_or_literal_expression)
                    .collect(),
            ),
            (None, TermValue::Map(entries)) => {
                let mut m = Map::new();
                for (k, v) in entries {
                    m.insert(k.clone(), v.to_literal_value_or_literal_expression());
                }
                Value::Object(m)
            }
            _ => Value::String(format!("${{{}}}", self)),
        }
    }
}

fn negate(n: Number) -> Number {
    match n {
        Number::Int(i) => i
            .checked_neg()
            .map(Number::Int)
            .unwrap_or(Number::Float(-(i as f64))),
        Number::Float(x) => Number::Float(-x),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unary {
            Some(UnaryOperator::Not) => f.write_str("not ")?,
            Some(op) => f.write_str(op.as_str())?,
            None => {}
        }
        match &self.value {
            TermValue::Primitive(p) => write!(f, "{}", p),
            TermValue::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            TermValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", quote(k), v)?;
                }
                f.write_str("}")
            }
            TermValue::Variable(name) => f.write_str(name),
            TermValue::Call(call) => {
                write!(f, "{}(", call.name)?;
                write_joined(f, &call.args)?;
                f.write_str(")")
            }
            TermValue::Parenthesized(inner) => write!(f, "({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub left: Term,
    pub rest: Vec<(BinaryOperator, Term)>,
}

impl Expression {
    pub fn new(left: Term) -> Self {
        Expression {
            left,
            rest: Vec::new(),
        }
    }

    pub fn primitive(p: Primitive) -> Self {
        Expression::new(Term::new(TermValue::Primitive(p)))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::new(Term::new(TermValue::Variable(name.into())))
    }

    /// True iff the value is known at compile time: no binary operators and
    /// a literal term.
    pub fn is_literal(&self) -> bool {
        self.rest.is_empty() && self.left.is_literal()
    }

    /// Lower to an output value: literals stay native values, anything else
    /// becomes a `${...}` expression string. Containers are lowered element
    /// by element, so a list may mix native values and expression strings.
    pub fn to_literal_value_or_literal_expression(&self) -> Value {
        if self.rest.is_empty() {
            self.left.to_literal_value_or_literal_expression()
        } else {
            Value::String(format!("${{{}}}", self))
        }
    }

    /// The single term, if this expression has no binary operators.
    pub fn single_term(&self) -> Option<&Term> {
        self.rest.is_empty().then_some(&self.left)
    }

    /// The dotted name if this expression is a bare fully-qualified
    /// identifier such as `http.default_retry`.
    pub fn as_qualified_name(&self) -> Option<&str> {
        let term = self.single_term()?;
        if term.unary.is_some() {
            return None;
        }
        match &term.value {
            TermValue::Variable(name) if is_qualified_name(name) => Some(name),
            _ => None,
        }
    }
}

fn is_qualified_name(name: &str) -> bool {
    name.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left)?;
        for (op, term) in &self.rest {
            write!(f, " {} {}", op.as_str(), term)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int(n: i64) -> Expression {
        Expression::primitive(Primitive::Number(Number::Int(n)))
    }

    fn list(items: Vec<Expression>) -> Expression {
        Expression::new(Term::new(TermValue::List(items)))
    }

    #[test]
    fn binary_expression_becomes_expression_string() {
        let e = Expression {
            left: Term::new(TermValue::Primitive(Primitive::Number(Number::Int(1)))),
            rest: vec![(
                BinaryOperator::Add,
                Term::new(TermValue::Primitive(Primitive::Number(Number::Int(2)))),
            )],
        };
        assert!(!e.is_literal());
        assert_eq!(e.to_literal_value_or_literal_expression(), json!("${1 + 2}"));
    }

    #[test]
    fn mixed_list_wraps_only_non_literal_elements() {
        let e = list(vec![int(1), Expression::variable("x"), list(vec![int(2)])]);
        assert!(!e.is_literal());
        assert_eq!(
            e.to_literal_value_or_literal_expression(),
            json!([1, "${x}", [2]])
        );
    }

    #[test]
    fn map_keeps_insertion_order() {
        let e = Expression::new(Term::new(TermValue::Map(vec![
            ("z".to_owned(), int(1)),
            ("a".to_owned(), Expression::variable("v")),
        ])));
        let value = e.to_literal_value_or_literal_expression();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(value["a"], json!("${v}"));
        assert_eq!(e.to_string(), r#"{"z": 1, "a": v}"#);
    }

    #[test]
    fn unary_minus_applies_to_number_literals() {
        let e = Expression::new(Term {
            unary: Some(UnaryOperator::Minus),
            value: TermValue::Primitive(Primitive::Number(Number::Float(2.5))),
        });
        assert!(e.is_literal());
        assert_eq!(e.to_literal_value_or_literal_expression(), json!(-2.5));
    }

    #[test]
    fn not_is_never_literal() {
        let e = Expression::new(Term {
            unary: Some(UnaryOperator::Not),
            value: TermValue::Primitive(Primitive::Bool(true)),
        });
        assert!(!e.is_literal());
        assert_eq!(e.to_literal_value_or_literal_expression(), json!("${not true}"));
    }

    #[test]
    fn textual_rendering_quotes_strings_and_calls() {
        let call = Expression::new(Term::new(TermValue::Call(FunctionInvocation {
            name: "text.concat".to_owned(),
            args: vec![
                Expression::primitive(Primitive::Str("a\"b".to_owned())),
                Expression::variable("x"),
            ],
        })));
        assert_eq!(call.to_string(), r#"text.concat("a\"b", x)"#);
        let neg = Expression::new(Term {
            unary: Some(UnaryOperator::Minus),
            value: TermValue::Parenthesized(Box::new(Expression::variable("y"))),
        });
        assert_eq!(neg.to_literal_value_or_literal_expression(), json!("${-(y)}"));
    }

    #[test]
    fn lowering_is_idempotent_on_literals() {
        let e = list(vec![int(1), Expression::primitive(Primitive::Str("s".to_owned()))]);
        let once = e.to_literal_value_or_literal_expression();
        assert_eq!(once, json!([1, "s"]));
        assert_eq!(once, e.to_literal_value_or_literal_expression());
    }

    #[test]
    fn qualified_name_detection() {
        assert_eq!(
            Expression::variable("http.default_retry").as_qualified_name(),
            Some("http.default_retry")
        );
        assert_eq!(Expression::variable("a[0]").as_qualified_name(), None);
        assert_eq!(int(1).as_qualified_name(), None);
    }
}
