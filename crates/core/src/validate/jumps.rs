use super::ValidatorKind;
use crate::ast::{walk_steps, NamedProgram, WorkflowStep};
use crate::error::ValidationIssue;
use std::collections::HashSet;

/// Reserved jump target ending the current subworkflow.
const END: &str = "end";

pub(super) fn missing_jump_targets(program: &NamedProgram) -> Vec<ValidationIssue> {
    let subworkflow_names: HashSet<&str> =
        program.subworkflows.iter().map(|s| s.name.as_str()).collect();
    let mut issues = Vec::new();

    for sub in &program.subworkflows {
        let mut step_names = HashSet::new();
        walk_steps(&sub.steps, &mut |step| {
            step_names.insert(step.name.as_str());
        });

        let mut missing = |kind: &str, step: &str, target: &str| {
            issues.push(ValidationIssue::new(
                ValidatorKind::MissingJumpTarget,
                format!(
                    "Missing jump target '{}' for {} in step '{}' of subworkflow '{}'",
                    target, kind, step, sub.name
                ),
            ));
        };

        walk_steps(&sub.steps, &mut |step| match &step.step {
            WorkflowStep::Call(call) => {
                // Dotted names are library or runtime functions.
                let known = call.call.contains('.')
                    || step_names.contains(call.call.as_str())
                    || subworkflow_names.contains(call.call.as_str());
                if !known {
                    missing("call", &step.name, &call.call);
                }
            }
            WorkflowStep::Switch(switch) => {
                let nexts = switch
                    .next
                    .iter()
                    .chain(switch.branches.iter().filter_map(|b| b.next.as_ref()));
                for next in nexts {
                    if next != END && !step_names.contains(next.as_str()) {
                        missing("next", &step.name, next);
                    }
                }
            }
            _ => {}
        });
    }
    issues
}
