//! Compilation errors.
//!
//! Lexing, parsing and CST-to-AST errors abort at the first occurrence.
//! Validation issues are collected from every enabled validator and reported
//! together as one [`WorkflowValidationError`].

use serde::Serialize;
use std::fmt;

/// A position in the source text. `offset` is a byte offset, `line` and
/// `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceSpan {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// No token pattern matches at `span`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unexpected character sequence '{text}' at {span} (offset {offset})", offset = .span.offset)]
pub struct LexError {
    pub text: String,
    pub span: SourceSpan,
}

/// A token stream that does not match the grammar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub message: String,
    pub span: SourceSpan,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: SourceSpan) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

/// A syntactically valid program with a local semantic defect, detected
/// while building the AST.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub struct PostParsingError {
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl PostParsingError {
    pub fn new(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        PostParsingError {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for PostParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} at {}", self.message, span),
            None => f.write_str(&self.message),
        }
    }
}

/// The CST did not have the shape the grammar guarantees. Signals a
/// compiler defect, never a user error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("internal parsing error: {0}")]
pub struct InternalParsingError(pub String);

/// One problem reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: crate::validate::ValidatorKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: crate::validate::ValidatorKind, message: impl Into<String>) -> Self {
        ValidationIssue {
            kind,
            message: message.into(),
        }
    }
}

/// All issues found by the enabled validators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub struct WorkflowValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl WorkflowValidationError {
    /// True if any issue was reported by the validator `kind`.
    pub fn has(&self, kind: crate::validate::ValidatorKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

impl fmt::Display for WorkflowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workflow validation failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {}: {}", issue.kind, issue.message)?;
        }
        Ok(())
    }
}

/// Any error the compilation pipeline can produce.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    PostParsing(#[from] PostParsingError),
    #[error("{0}")]
    Validation(#[from] WorkflowValidationError),
    #[error("{0}")]
    Internal(#[from] InternalParsingError),
    #[error("YAML serialization failed: {0}")]
    Yaml(String),
}

impl CompileError {
    /// Stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex(_) => "LexError",
            CompileError::Parse(_) => "ParseError",
            CompileError::PostParsing(_) => "PostParsingError",
            CompileError::Validation(_) => "WorkflowValidationError",
            CompileError::Internal(_) => "InternalParsingError",
            CompileError::Yaml(_) => "YamlError",
        }
    }

    /// Source location of the error, where one is known.
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            CompileError::Lex(e) => Some(e.span),
            CompileError::Parse(e) => Some(e.span),
            CompileError::PostParsing(e) => e.span,
            _ => None,
        }
    }

    /// Machine-readable form used by `--error-format json`.
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut m = serde_json::Map::new();
        m.insert("kind".to_owned(), serde_json::json!(self.kind()));
        let message = match self {
            CompileError::Lex(e) => format!("unexpected character sequence '{}'", e.text),
            CompileError::Parse(e) => e.message.clone(),
            CompileError::PostParsing(e) => e.message.clone(),
            CompileError::Validation(e) => {
                format!("workflow validation failed with {} issue(s)", e.issues.len())
            }
            CompileError::Internal(e) => e.0.clone(),
            CompileError::Yaml(e) => e.clone(),
        };
        m.insert("message".to_owned(), serde_json::json!(message));
        if let Some(span) = self.span() {
            m.insert("line".to_owned(), serde_json::json!(span.line));
            m.insert("column".to_owned(), serde_json::json!(span.column));
            m.insert("offset".to_owned(), serde_json::json!(span.offset));
        }
        if let CompileError::Validation(e) = self {
            m.insert("issues".to_owned(), serde_json::json!(e.issues));
        }
        serde_json::Value::Object(m)
    }
}
