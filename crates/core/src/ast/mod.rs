//! Typed AST shared by the visitor, namer, validators and renderer.

pub mod expressions;
pub mod steps;

pub use crate::lexer::Number;
pub use expressions::{
    BinaryOperator, Expression, FunctionInvocation, Primitive, Term, TermValue, UnaryOperator,
};
pub use steps::{
    walk_steps, AssignStep, Assignments, CallStep, ForIterable, ForStep, NamedProgram,
    NamedWorkflowStep, NextStep, ParallelBody, ParallelOptions, ParallelStep, Program,
    ProgramAst, RaiseStep, RetryPolicy, ReturnStep, StepsStep, Subworkflow, SwitchCondition,
    SwitchStep, TryStep, WorkflowParameter, WorkflowStep, WorkflowStepAst,
};
