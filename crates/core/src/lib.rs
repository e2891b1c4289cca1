#![allow(clippy::result_large_err)]
//! workflowscript-core: WorkflowScript compiler core library.
//!
//! Compiles WorkflowScript source text into a step-graph workflow document
//! (a YAML dialect for a serverless workflow engine).
//!
//! # Pipeline
//!
//! 1. [`lexer::tokenize`] -- source text to tokens
//! 2. [`parser::parse`] -- tokens to a concrete syntax tree
//! 3. [`visitor::build_program`] -- CST to typed AST, with local checks
//! 4. [`namer::name_program`] -- unique `<kind><n>` step names
//! 5. [`validate::validate`] -- whole-program static checks
//! 6. [`render::render_program`] -- named steps to the document value
//!
//! [`compile()`] runs all of them; [`compile_to_yaml()`] also emits YAML.

pub mod ast;
pub mod compile;
pub mod cst;
pub mod error;
pub mod lexer;
pub mod namer;
pub mod parser;
pub mod render;
pub mod validate;
pub mod visitor;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{NamedProgram, NamedWorkflowStep, ProgramAst, WorkflowStep, WorkflowStepAst};
pub use compile::CompileOptions;
pub use error::{CompileError, SourceSpan, ValidationIssue, WorkflowValidationError};
pub use validate::ValidatorKind;

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::{compile, compile_to_yaml};
