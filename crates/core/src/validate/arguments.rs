use super::ValidatorKind;
use crate::ast::{walk_steps, NamedProgram, WorkflowStep};
use crate::error::ValidationIssue;
use std::collections::{BTreeSet, HashMap};

struct Signature<'a> {
    required: BTreeSet<&'a str>,
    optional: BTreeSet<&'a str>,
}

pub(super) fn wrong_number_of_call_arguments(program: &NamedProgram) -> Vec<ValidationIssue> {
    let mut signatures: HashMap<&str, Signature> = HashMap::new();
    for sub in &program.subworkflows {
        signatures.entry(sub.name.as_str()).or_insert_with(|| {
            let (with_default, without): (Vec<_>, Vec<_>) =
                sub.params.iter().partition(|p| p.default.is_some());
            Signature {
                required: without.into_iter().map(|p| p.name.as_str()).collect(),
                optional: with_default.into_iter().map(|p| p.name.as_str()).collect(),
            }
        });
    }

    let mut issues = Vec::new();
    for sub in &program.subworkflows {
        walk_steps(&sub.steps, &mut |step| {
            let WorkflowStep::Call(call) = &step.step else {
                return;
            };
            let Some(signature) = signatures.get(call.call.as_str()) else {
                return;
            };
            let provided: BTreeSet<&str> = call.args.iter().map(|(name, _)| name.as_str()).collect();

            for param in signature.required.difference(&provided) {
                issues.push(ValidationIssue::new(
                    ValidatorKind::WrongNumberOfCallArguments,
                    format!(
                        "Required parameter '{}' missing in call to '{}' in step '{}'",
                        param, call.call, step.name
                    ),
                ));
            }
            for arg in &provided {
                if !signature.required.contains(arg) && !signature.optional.contains(arg) {
                    issues.push(ValidationIssue::new(
                        ValidatorKind::WrongNumberOfCallArguments,
                        format!(
                            "Unknown argument '{}' in call to '{}' in step '{}'",
                            arg, call.call, step.name
                        ),
                    ));
                }
            }
        });
    }
    issues
}
