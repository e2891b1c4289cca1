//! Workflow steps, before and after naming.
//!
//! Container steps are generic over their child type `C`: the visitor
//! builds trees of [`WorkflowStepAst`], and the namer turns each one into a
//! [`NamedWorkflowStep`] carrying a [`WorkflowStep`]. Leaf steps are shared
//! by both forms.

use super::expressions::{Expression, Primitive};
use crate::lexer::Number;

/// Ordered `(name, value)` pairs.
pub type Assignments = Vec<(String, Expression)>;

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStep {
    pub assignments: Assignments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStep {
    pub call: String,
    pub args: Assignments,
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForIterable {
    In(Expression),
    /// Inclusive numeric range `[start, end]`
    Range(Number, Number),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStep<C> {
    pub value: String,
    pub index: Option<String>,
    pub iterable: ForIterable,
    pub steps: Vec<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NextStep {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParallelOptions {
    pub shared: Option<Vec<String>>,
    pub concurrency_limit: Option<i64>,
    pub exception_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParallelBody<C> {
    /// Each branch is a `Steps` step.
    Branches(Vec<C>),
    For(ForStep<C>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParallelStep<C> {
    pub options: ParallelOptions,
    pub body: ParallelBody<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaiseStep {
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStep {
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepsStep<C> {
    pub steps: Vec<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCondition<C> {
    pub condition: Expression,
    pub steps: Vec<C>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStep<C> {
    pub branches: Vec<SwitchCondition<C>>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// A named runtime policy such as `http.default_retry`
    Default(String),
    Custom {
        predicate: String,
        max_retries: Number,
        initial_delay: Number,
        max_delay: Number,
        multiplier: Number,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStep<C> {
    pub try_steps: Vec<C>,
    pub retry: Option<RetryPolicy>,
    pub error_var: Option<String>,
    pub except_steps: Vec<C>,
}

/// A step as built by the visitor, before names are assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStepAst {
    Assign(AssignStep),
    Call(CallStep),
    For(ForStep<WorkflowStepAst>),
    Next(NextStep),
    Parallel(ParallelStep<WorkflowStepAst>),
    Raise(RaiseStep),
    Return(ReturnStep),
    Steps(StepsStep<WorkflowStepAst>),
    Switch(SwitchStep<WorkflowStepAst>),
    Try(TryStep<WorkflowStepAst>),
}

/// A step whose nested steps all carry names.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStep {
    Assign(AssignStep),
    Call(CallStep),
    For(ForStep<NamedWorkflowStep>),
    Next(NextStep),
    Parallel(ParallelStep<NamedWorkflowStep>),
    Raise(RaiseStep),
    Return(ReturnStep),
    Steps(StepsStep<NamedWorkflowStep>),
    Switch(SwitchStep<NamedWorkflowStep>),
    Try(TryStep<NamedWorkflowStep>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedWorkflowStep {
    pub name: String,
    pub step: WorkflowStep,
}

impl NamedWorkflowStep {
    /// Directly nested steps, in document order.
    pub fn children(&self) -> Vec<&NamedWorkflowStep> {
        match &self.step {
            WorkflowStep::Assign(_)
            | WorkflowStep::Call(_)
            | WorkflowStep::Next(_)
            | WorkflowStep::Raise(_)
            | WorkflowStep::Return(_) => Vec::new(),
            WorkflowStep::For(f) => f.steps.iter().collect(),
            WorkflowStep::Parallel(p) => match &p.body {
                ParallelBody::Branches(branches) => branches.iter().collect(),
                ParallelBody::For(f) => f.steps.iter().collect(),
            },
            WorkflowStep::Steps(s) => s.steps.iter().collect(),
            WorkflowStep::Switch(s) => s.branches.iter().flat_map(|b| b.steps.iter()).collect(),
            WorkflowStep::Try(t) => t.try_steps.iter().chain(t.except_steps.iter()).collect(),
        }
    }
}

/// Visit every step in `steps` and their descendants, depth-first preorder.
pub fn walk_steps<'a>(steps: &'a [NamedWorkflowStep], f: &mut impl FnMut(&'a NamedWorkflowStep)) {
    for step in steps {
        f(step);
        for child in step.children() {
            walk_steps(std::slice::from_ref(child), f);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowParameter {
    pub name: String,
    pub default: Option<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subworkflow<C> {
    pub name: String,
    pub params: Vec<WorkflowParameter>,
    pub steps: Vec<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program<C> {
    pub subworkflows: Vec<Subworkflow<C>>,
}

/// Visitor output.
pub type ProgramAst = Program<WorkflowStepAst>;
/// Namer output; the input of validation and rendering.
pub type NamedProgram = Program<NamedWorkflowStep>;
