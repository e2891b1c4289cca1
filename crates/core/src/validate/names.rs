use super::ValidatorKind;
use crate::ast::{walk_steps, NamedProgram, NamedWorkflowStep};
use crate::error::ValidationIssue;
use std::collections::{BTreeMap, HashSet};

pub(super) fn invalid_workflow_names(program: &NamedProgram) -> Vec<ValidationIssue> {
    program
        .subworkflows
        .iter()
        .enumerate()
        .filter(|(_, sub)| sub.name.is_empty())
        .map(|(i, _)| {
            ValidationIssue::new(
                ValidatorKind::InvalidWorkflowName,
                format!("Subworkflow #{} has an empty name", i + 1),
            )
        })
        .collect()
}

/// Names occurring more than once, in first-occurrence order.
fn repeated<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut order = Vec::new();
    for name in names {
        let count = counts.entry(name).or_insert(0);
        if *count == 0 {
            order.push(name);
        }
        *count += 1;
    }
    order.into_iter().filter(|n| counts[n] > 1).collect()
}

pub(super) fn duplicated_step_names(program: &NamedProgram) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for sub in &program.subworkflows {
        let mut visited: HashSet<*const NamedWorkflowStep> = HashSet::new();
        let mut names = Vec::new();
        walk_steps(&sub.steps, &mut |step| {
            if visited.insert(step as *const NamedWorkflowStep) {
                names.push(step.name.as_str());
            }
        });
        for name in repeated(names) {
            issues.push(ValidationIssue::new(
                ValidatorKind::DuplicatedStepName,
                format!("Duplicated step name '{}' in subworkflow '{}'", name, sub.name),
            ));
        }
    }
    issues
}

pub(super) fn duplicated_subworkflow_names(program: &NamedProgram) -> Vec<ValidationIssue> {
    repeated(program.subworkflows.iter().map(|s| s.name.as_str()))
        .into_iter()
        .map(|name| {
            ValidationIssue::new(
                ValidatorKind::DuplicatedSubworkflowName,
                format!("Duplicated subworkflow name '{}'", name),
            )
        })
        .collect()
}
