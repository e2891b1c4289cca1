//! Static checks over the named step tree.
//!
//! Each validator is a pure function from the program to a list of issues.
//! Every enabled validator runs; their issues are reported together.

mod arguments;
mod jumps;
mod names;

use crate::ast::NamedProgram;
use crate::error::{ValidationIssue, WorkflowValidationError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidatorKind {
    InvalidWorkflowName,
    DuplicatedStepName,
    DuplicatedSubworkflowName,
    MissingJumpTarget,
    WrongNumberOfCallArguments,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 5] = [
        ValidatorKind::InvalidWorkflowName,
        ValidatorKind::DuplicatedStepName,
        ValidatorKind::DuplicatedSubworkflowName,
        ValidatorKind::MissingJumpTarget,
        ValidatorKind::WrongNumberOfCallArguments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValidatorKind::InvalidWorkflowName => "invalidWorkflowName",
            ValidatorKind::DuplicatedStepName => "duplicatedStepName",
            ValidatorKind::DuplicatedSubworkflowName => "duplicatedSubworkflowName",
            ValidatorKind::MissingJumpTarget => "missingJumpTarget",
            ValidatorKind::WrongNumberOfCallArguments => "wrongNumberOfCallArguments",
        }
    }

    fn check(self) -> Validator {
        match self {
            ValidatorKind::InvalidWorkflowName => names::invalid_workflow_names,
            ValidatorKind::DuplicatedStepName => names::duplicated_step_names,
            ValidatorKind::DuplicatedSubworkflowName => names::duplicated_subworkflow_names,
            ValidatorKind::MissingJumpTarget => jumps::missing_jump_targets,
            ValidatorKind::WrongNumberOfCallArguments => arguments::wrong_number_of_call_arguments,
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown validator '{name}' (valid names: {valid})", valid = valid_names())]
pub struct UnknownValidator {
    pub name: String,
}

fn valid_names() -> String {
    ValidatorKind::ALL.map(ValidatorKind::as_str).join(", ")
}

impl FromStr for ValidatorKind {
    type Err = UnknownValidator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidatorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownValidator { name: s.to_owned() })
    }
}

type Validator = fn(&NamedProgram) -> Vec<ValidationIssue>;

/// Run every validator not in `disabled`, in declaration order.
pub fn validate(
    program: &NamedProgram,
    disabled: &BTreeSet<ValidatorKind>,
) -> Result<(), WorkflowValidationError> {
    let mut issues = Vec::new();
    for kind in ValidatorKind::ALL {
        if disabled.contains(&kind) {
            tracing::debug!(validator = %kind, "validator disabled");
            continue;
        }
        issues.extend((kind.check())(program));
    }
    tracing::debug!(issues = issues.len(), "validation finished");
    if issues.is_empty() {
        Ok(())
    } else {
        Err(WorkflowValidationError { issues })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ast::*;
    use crate::{lexer, namer, parser, visitor};

    /// Compile `src` up to the named program.
    pub fn named(src: &str) -> NamedProgram {
        let tokens = lexer::tokenize(src).unwrap();
        let cst = parser::parse(&tokens).unwrap();
        namer::name_program(visitor::build_program(&cst).unwrap())
    }

    pub fn step(name: &str, step: WorkflowStep) -> NamedWorkflowStep {
        NamedWorkflowStep {
            name: name.to_owned(),
            step,
        }
    }

    pub fn workflow(name: &str, steps: Vec<NamedWorkflowStep>) -> Subworkflow<NamedWorkflowStep> {
        Subworkflow {
            name: name.to_owned(),
            params: Vec::new(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::named;
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ValidatorKind::ALL {
            assert_eq!(kind.as_str().parse::<ValidatorKind>(), Ok(kind));
        }
        let err = "noSuchCheck".parse::<ValidatorKind>().unwrap_err();
        assert!(err.to_string().contains("missingJumpTarget"));
    }

    #[test]
    fn all_issues_are_collected() {
        let program = named("workflow main() { r = nowhere(x = 1) } workflow main() { }");
        let err = validate(&program, &BTreeSet::new()).unwrap_err();
        assert!(err.has(ValidatorKind::DuplicatedSubworkflowName));
        assert!(err.has(ValidatorKind::MissingJumpTarget));
    }

    #[test]
    fn disabled_validators_do_not_report() {
        let program = named("workflow main() { r = nowhere(x = 1) } workflow main() { }");
        let disabled: BTreeSet<_> = [ValidatorKind::DuplicatedSubworkflowName].into();
        let err = validate(&program, &disabled).unwrap_err();
        assert!(!err.has(ValidatorKind::DuplicatedSubworkflowName));
        assert!(err.has(ValidatorKind::MissingJumpTarget));

        let disabled: BTreeSet<_> = ValidatorKind::ALL.into();
        assert!(validate(&program, &disabled).is_ok());
    }

    #[test]
    fn clean_program_passes() {
        let program = named("workflow main() { a = 1 r = helper(n = a) } workflow helper(n) { return n }");
        assert!(validate(&program, &BTreeSet::new()).is_ok());
    }
}
