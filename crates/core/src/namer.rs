//! Step naming: gives every step a `<kind><n>` name.
//!
//! One counter per kind is shared by the whole program, so names are unique
//! across subworkflows as well as within them. Names are handed out
//! depth-first, parent before children.

use crate::ast::*;
use std::collections::BTreeMap;

/// Per-kind counters for one compilation.
#[derive(Debug, Default)]
pub struct StepNameGenerator {
    counters: BTreeMap<&'static str, usize>,
}

impl StepNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next name for `prefix`, counting from 1.
    pub fn generate(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{}{}", prefix, counter)
    }
}

fn prefix(step: &WorkflowStepAst) -> &'static str {
    match step {
        WorkflowStepAst::Assign(_) => "assign",
        WorkflowStepAst::Call(_) => "call",
        WorkflowStepAst::For(_) => "for",
        WorkflowStepAst::Next(_) => "next",
        WorkflowStepAst::Parallel(_) => "parallel",
        WorkflowStepAst::Raise(_) => "raise",
        WorkflowStepAst::Return(_) => "return",
        WorkflowStepAst::Steps(_) => "steps",
        WorkflowStepAst::Switch(_) => "switch",
        WorkflowStepAst::Try(_) => "try",
    }
}

/// Name every step of `program` with a fresh generator.
pub fn name_program(program: ProgramAst) -> NamedProgram {
    let mut names = StepNameGenerator::new();
    let subworkflows = program
        .subworkflows
        .into_iter()
        .map(|sub| Subworkflow {
            name: sub.name,
            params: sub.params,
            steps: name_steps(sub.steps, &mut names),
        })
        .collect();
    let named = Program { subworkflows };
    tracing::debug!(steps = count_steps(&named), "named steps");
    named
}

fn count_steps(program: &NamedProgram) -> usize {
    let mut count = 0;
    for sub in &program.subworkflows {
        walk_steps(&sub.steps, &mut |_| count += 1);
    }
    count
}

pub fn name_steps(steps: Vec<WorkflowStepAst>, names: &mut StepNameGenerator) -> Vec<NamedWorkflowStep> {
    steps.into_iter().map(|s| name_step(s, names)).collect()
}

pub fn name_step(step: WorkflowStepAst, names: &mut StepNameGenerator) -> NamedWorkflowStep {
    let name = names.generate(prefix(&step));
    tracing::trace!(%name, "named step");
    let step = match step {
        WorkflowStepAst::Assign(s) => WorkflowStep::Assign(s),
        WorkflowStepAst::Call(s) => WorkflowStep::Call(s),
        WorkflowStepAst::Next(s) => WorkflowStep::Next(s),
        WorkflowStepAst::Raise(s) => WorkflowStep::Raise(s),
        WorkflowStepAst::Return(s) => WorkflowStep::Return(s),
        WorkflowStepAst::For(f) => WorkflowStep::For(name_for(f, names)),
        WorkflowStepAst::Parallel(p) => WorkflowStep::Parallel(ParallelStep {
            options: p.options,
            body: match p.body {
                ParallelBody::Branches(branches) => {
                    ParallelBody::Branches(name_steps(branches, names))
                }
                // The loop itself is part of the parallel step and gets no name.
                ParallelBody::For(f) => ParallelBody::For(name_for(f, names)),
            },
        }),
        WorkflowStepAst::Steps(s) => WorkflowStep::Steps(StepsStep {
            steps: name_steps(s.steps, names),
        }),
        WorkflowStepAst::Switch(s) => WorkflowStep::Switch(SwitchStep {
            branches: s
                .branches
                .into_iter()
                .map(|b| SwitchCondition {
                    condition: b.condition,
                    steps: name_steps(b.steps, names),
                    next: b.next,
                })
                .collect(),
            next: s.next,
        }),
        WorkflowStepAst::Try(t) => {
            let try_steps = name_steps(t.try_steps, names);
            let except_steps = name_steps(t.except_steps, names);
            WorkflowStep::Try(TryStep {
                try_steps,
                retry: t.retry,
                error_var: t.error_var,
                except_steps,
            })
        }
    };
    NamedWorkflowStep { name, step }
}

fn name_for(f: ForStep<WorkflowStepAst>, names: &mut StepNameGenerator) -> ForStep<NamedWorkflowStep> {
    ForStep {
        value: f.value,
        index: f.index,
        iterable: f.iterable,
        steps: name_steps(f.steps, names),
    }
}
