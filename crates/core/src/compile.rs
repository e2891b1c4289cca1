//! Compilation pipeline: WorkflowScript source -> workflow document.
//!
//! A thin orchestrator calling each stage in order. Every call builds its
//! own step-name counters and temporaries, so repeated or concurrent
//! compilations never share state.

use crate::error::CompileError;
use crate::validate::ValidatorKind;
use crate::{lexer, namer, parser, render, validate, visitor};
use serde_json::Value;
use std::collections::BTreeSet;

/// Settings for one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Validators to skip. All validators run by default.
    pub disabled_validators: BTreeSet<ValidatorKind>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable(mut self, kind: ValidatorKind) -> Self {
        self.disabled_validators.insert(kind);
        self
    }
}

/// Compile `source` into the workflow document, or return the first error
/// (all validation issues together if validation fails).
pub fn compile(source: &str, options: &CompileOptions) -> Result<Value, CompileError> {
    // Tokens, then the concrete syntax tree
    let tokens = lexer::tokenize(source)?;
    let cst = parser::parse(&tokens)?;

    // Typed AST with local semantic checks
    let ast = visitor::build_program(&cst)?;

    // Step names, then whole-program checks
    let program = namer::name_program(ast);
    validate::validate(&program, &options.disabled_validators)?;

    let document = render::render_program(&program);
    tracing::debug!(subworkflows = program.subworkflows.len(), "compiled program");
    Ok(document)
}

/// [`compile`] followed by YAML serialization.
pub fn compile_to_yaml(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let document = compile(source, options)?;
    render::to_yaml(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_program() {
        let doc = compile("workflow main() { a = 1 }", &CompileOptions::default()).unwrap();
        assert_eq!(doc, json!({"main": {"steps": [{"assign1": {"assign": [{"a": 1}]}}]}}));
    }

    #[test]
    fn options_builder_collects_disabled_validators() {
        let options = CompileOptions::new()
            .disable(ValidatorKind::MissingJumpTarget)
            .disable(ValidatorKind::MissingJumpTarget);
        assert_eq!(options.disabled_validators.len(), 1);
        assert!(compile("workflow main() { r = nowhere(a = 1) }", &options).is_ok());
        assert!(matches!(
            compile("workflow main() { r = nowhere(a = 1) }", &CompileOptions::default()),
            Err(CompileError::Validation(_))
        ));
    }

    #[test]
    fn yaml_output() {
        let yaml = compile_to_yaml("workflow main() { return \"ok\" }", &CompileOptions::default())
            .unwrap();
        let reparsed: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed, json!({"main": {"steps": [{"return1": {"return": "ok"}}]}}));
        assert!(yaml.starts_with("main:\n"));
    }
}
