//! CST-to-AST visitor: one function per grammar rule.
//!
//! Local semantic checks (subscript types, iterable literals, parallel and
//! retry parameters) happen here and abort with a [`PostParsingError`] at the
//! first problem.

mod expressions;
mod options;
mod statements;

use crate::ast::*;
use crate::cst::{CstNode, Rule};
use crate::error::{CompileError, PostParsingError, SourceSpan};
use crate::lexer::Token;

/// Build the AST for a `Program` CST node.
pub fn build_program(cst: &CstNode) -> Result<ProgramAst, CompileError> {
    let mut visitor = Visitor::default();
    let program = visitor.visit_program(cst)?;
    tracing::debug!(
        subworkflows = program.subworkflows.len(),
        "built AST"
    );
    Ok(program)
}

#[derive(Default)]
struct Visitor {
    /// Counter for temporaries introduced by call lowering
    temp_counter: usize,
}

fn post_parsing(message: impl Into<String>, span: SourceSpan) -> CompileError {
    CompileError::PostParsing(PostParsingError::new(message, Some(span)))
}

impl Visitor {
    fn fresh_temp(&mut self) -> String {
        let name = format!("__temp{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    fn visit_program(&mut self, node: &CstNode) -> Result<ProgramAst, CompileError> {
        node.expect_rule(Rule::Program)?;
        let subworkflows = node
            .nodes("subworkflowDefinition")
            .map(|def| self.visit_subworkflow(def))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Program { subworkflows })
    }

    fn visit_subworkflow(
        &mut self,
        node: &CstNode,
    ) -> Result<Subworkflow<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::SubworkflowDefinition)?;
        let name = node.required_token("Identifier")?.image.clone();
        let params = self.visit_formal_parameter_list(node.required_node("formalParameterList")?)?;
        let steps = self.visit_statement_block(node.required_node("statementBlock")?)?;
        Ok(Subworkflow {
            name,
            params,
            steps,
        })
    }

    fn visit_formal_parameter_list(
        &mut self,
        node: &CstNode,
    ) -> Result<Vec<WorkflowParameter>, CompileError> {
        node.expect_rule(Rule::FormalParameterList)?;
        let mut params = Vec::new();
        for param in node.nodes("formalParameter") {
            let name = param.required_token("Identifier")?.image.clone();
            let default = match param.node("literal") {
                Some(literal) => Some(self.visit_literal(literal)?),
                None => None,
            };
            params.push(WorkflowParameter { name, default });
        }
        Ok(params)
    }

    /// Lower every statement of a block and merge runs of adjacent assigns.
    fn visit_statement_block(&mut self, node: &CstNode) -> Result<Vec<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::StatementBlock)?;
        let mut steps = Vec::new();
        for statement in node.nodes("statement") {
            steps.extend(self.visit_statement(statement)?);
        }
        Ok(merge_consecutive_assigns(steps))
    }
}

/// Merge each run of adjacent `Assign` steps into one step holding all of
/// their assignments in order. Nested blocks are merged separately when they
/// are visited.
pub fn merge_consecutive_assigns(steps: Vec<WorkflowStepAst>) -> Vec<WorkflowStepAst> {
    let mut merged: Vec<WorkflowStepAst> = Vec::with_capacity(steps.len());
    for step in steps {
        match (merged.last_mut(), step) {
            (Some(WorkflowStepAst::Assign(prev)), WorkflowStepAst::Assign(next)) => {
                prev.assignments.extend(next.assignments);
            }
            (_, step) => merged.push(step),
        }
    }
    merged
}

fn object_key(token: &crate::lexer::Spanned) -> String {
    match &token.token {
        Token::Str(s) => s.clone(),
        _ => token.image.clone(),
    }
}
