use super::options::{parallel_options, retry_policy};
use super::{post_parsing, Visitor};
use crate::ast::*;
use crate::cst::{CstNode, Rule};
use crate::error::{CompileError, InternalParsingError};

impl Visitor {
    /// Lower one statement; a call into a complex location yields two steps.
    pub(super) fn visit_statement(&mut self, node: &CstNode) -> Result<Vec<WorkflowStepAst>, CompileError> {
        let step = match node.rule {
            Rule::CallOrAssignmentStatement => return self.visit_call_or_assignment(node),
            Rule::IfStatement => WorkflowStepAst::Switch(self.visit_if(node)?),
            Rule::ForStatement => WorkflowStepAst::For(self.visit_for(node)?),
            Rule::ParallelStatement => WorkflowStepAst::Parallel(self.visit_parallel(node)?),
            Rule::TryStatement => WorkflowStepAst::Try(self.visit_try(node)?),
            Rule::ThrowStatement => WorkflowStepAst::Raise(RaiseStep {
                value: self.visit_expression(node.required_node("expression")?)?,
            }),
            Rule::BreakStatement => WorkflowStepAst::Next(NextStep {
                target: "break".to_owned(),
            }),
            Rule::ContinueStatement => WorkflowStepAst::Next(NextStep {
                target: "continue".to_owned(),
            }),
            Rule::ReturnStatement => {
                let value = match node.node("expression") {
                    Some(e) => Some(self.visit_expression(e)?),
                    None => None,
                };
                WorkflowStepAst::Return(ReturnStep { value })
            }
            other => {
                return Err(InternalParsingError(format!("{:?} is not a statement", other)).into())
            }
        };
        Ok(vec![step])
    }

    fn visit_call_or_assignment(&mut self, node: &CstNode) -> Result<Vec<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::CallOrAssignmentStatement)?;

        let Some(reference) = node.node("variableReference") else {
            return self.visit_bare_call(node);
        };
        let target = self.visit_variable_reference(reference)?;
        let simple_target = is_simple_name(&target);

        if let Some(call) = node.node("namedCall") {
            call.expect_rule(Rule::NamedCall)?;
            let name = self.visit_qualified_name(call.required_node("qualifiedName")?)?;
            let args = self.call_arguments(call.node("actualNamedParameterList"))?;

            if simple_target {
                return Ok(vec![WorkflowStepAst::Call(CallStep {
                    call: name,
                    args,
                    result: Some(target),
                })]);
            }

            // A call result must land in a plain variable; copy it afterwards.
            let temp = self.fresh_temp();
            return Ok(vec![
                WorkflowStepAst::Call(CallStep {
                    call: name,
                    args,
                    result: Some(temp.clone()),
                }),
                WorkflowStepAst::Assign(AssignStep {
                    assignments: vec![(target, Expression::variable(temp))],
                }),
            ]);
        }

        let value = self.visit_expression(node.required_node("expression")?)?;
        Ok(vec![WorkflowStepAst::Assign(AssignStep {
            assignments: vec![(target, value)],
        })])
    }

    fn visit_bare_call(&mut self, node: &CstNode) -> Result<Vec<WorkflowStepAst>, CompileError> {
        let name = self.visit_qualified_name(node.required_node("qualifiedName")?)?;

        if let Some(list) = node.node("actualParameterList") {
            let args = self.visit_actual_parameter_list(list)?;
            let invocation = Expression::new(Term::new(TermValue::Call(FunctionInvocation {
                name,
                args,
            })));
            return Ok(vec![WorkflowStepAst::Assign(AssignStep {
                assignments: vec![(String::new(), invocation)],
            })]);
        }

        let args = self.call_arguments(node.node("actualNamedParameterList"))?;
        Ok(vec![WorkflowStepAst::Call(CallStep {
            call: name,
            args,
            result: None,
        })])
    }

    fn visit_if(&mut self, node: &CstNode) -> Result<SwitchStep<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::IfStatement)?;
        let conditions: Vec<&CstNode> = node.nodes("expression").collect();
        let blocks: Vec<&CstNode> = node.nodes("statementBlock").collect();
        if blocks.len() != conditions.len() && blocks.len() != conditions.len() + 1 {
            return Err(InternalParsingError(format!(
                "if statement has {} conditions and {} blocks",
                conditions.len(),
                blocks.len()
            ))
            .into());
        }

        let mut branches = Vec::with_capacity(blocks.len());
        for (condition, block) in conditions.iter().zip(&blocks) {
            branches.push(SwitchCondition {
                condition: self.visit_expression(condition)?,
                steps: self.visit_statement_block(block)?,
                next: None,
            });
        }
        if blocks.len() > conditions.len() {
            branches.push(SwitchCondition {
                condition: Expression::primitive(Primitive::Bool(true)),
                steps: self.visit_statement_block(blocks[conditions.len()])?,
                next: None,
            });
        }
        Ok(SwitchStep {
            branches,
            next: None,
        })
    }

    fn visit_for(&mut self, node: &CstNode) -> Result<ForStep<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::ForStatement)?;
        let value = node.required_token("Identifier")?.image.clone();
        let iterable_node = node.required_node("expression")?;
        let iterable = self.visit_expression(iterable_node)?;
        if iterable.is_literal() && !iterable.to_literal_value_or_literal_expression().is_array() {
            return Err(post_parsing(
                "Value in a for loop is not iterable",
                iterable_node.span,
            ));
        }
        let steps = self.visit_statement_block(node.required_node("statementBlock")?)?;
        Ok(ForStep {
            value,
            index: None,
            iterable: ForIterable::In(iterable),
            steps,
        })
    }

    fn visit_parallel(&mut self, node: &CstNode) -> Result<ParallelStep<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::ParallelStatement)?;
        let options = match node.node("actualNamedParameterList") {
            Some(list) => parallel_options(self.visit_actual_named_parameter_list(list)?)?,
            None => ParallelOptions::default(),
        };

        let body = match node.node("forStatement") {
            Some(for_node) => ParallelBody::For(self.visit_for(for_node)?),
            None => {
                let mut branches = Vec::new();
                for block in node.nodes("statementBlock") {
                    branches.push(WorkflowStepAst::Steps(StepsStep {
                        steps: self.visit_statement_block(block)?,
                    }));
                }
                if branches.is_empty() {
                    return Err(InternalParsingError(
                        "parallel statement without branches".to_owned(),
                    )
                    .into());
                }
                ParallelBody::Branches(branches)
            }
        };
        Ok(ParallelStep { options, body })
    }

    fn visit_try(&mut self, node: &CstNode) -> Result<TryStep<WorkflowStepAst>, CompileError> {
        node.expect_rule(Rule::TryStatement)?;
        let try_steps = self.visit_statement_block(node.required_node("tryBlock")?)?;

        let retry = match node.token("Retry") {
            Some(retry_token) => {
                let args = self
                    .visit_actual_named_parameter_list(node.required_node("actualNamedParameterList")?)?;
                Some(retry_policy(args, retry_token.span)?)
            }
            None => None,
        };

        let (error_var, except_steps) = match node.node("catchBlock") {
            Some(block) => (
                Some(node.required_token("Identifier")?.image.clone()),
                self.visit_statement_block(block)?,
            ),
            None => (None, Vec::new()),
        };

        Ok(TryStep {
            try_steps,
            retry,
            error_var,
            except_steps,
        })
    }
}

fn is_simple_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
