//! End-to-end compilation: source text in, workflow document out.

use serde_json::{json, Value};
use std::collections::BTreeSet;
use workflowscript_core::ast::*;
use workflowscript_core::validate::validate;
use workflowscript_core::{compile, compile_to_yaml, CompileError, CompileOptions, ValidatorKind};

fn compile_ok(src: &str) -> Value {
    compile(src, &CompileOptions::default()).unwrap_or_else(|e| panic!("compile failed: {}", e))
}

fn compile_err(src: &str) -> CompileError {
    match compile(src, &CompileOptions::default()) {
        Ok(doc) => panic!("expected an error, got {}", doc),
        Err(e) => e,
    }
}

/// Names of the top-level steps of `workflow`.
fn step_names(doc: &Value, workflow: &str) -> Vec<String> {
    doc[workflow]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s.as_object().unwrap().keys().cloned())
        .collect()
}

#[test]
fn single_assignment() {
    assert_eq!(
        compile_ok("workflow main() { a = 1 }"),
        json!({"main": {"steps": [{"assign1": {"assign": [{"a": 1}]}}]}})
    );
}

#[test]
fn binary_expression_becomes_expression_string() {
    let doc = compile_ok("workflow main() { a = 1 + 2 }");
    assert_eq!(doc["main"]["steps"][0]["assign1"]["assign"][0]["a"], json!("${1 + 2}"));
}

#[test]
fn subscripted_assignment_key() {
    let doc = compile_ok("workflow main() { a_list[idx] = 2 }");
    assert_eq!(
        doc["main"]["steps"][0]["assign1"]["assign"][0],
        json!({"a_list[idx]": 2})
    );
}

#[test]
fn literal_number_is_not_iterable() {
    match compile_err("workflow main() { for (x in 999) {} }") {
        CompileError::PostParsing(e) => assert!(e.message.contains("not iterable")),
        other => panic!("expected PostParsingError, got {:?}", other),
    }
}

#[test]
fn duplicated_subworkflows() {
    match compile_err("workflow main() { a = 1 } workflow main() { b = 2 }") {
        CompileError::Validation(e) => assert!(e.has(ValidatorKind::DuplicatedSubworkflowName)),
        other => panic!("expected WorkflowValidationError, got {:?}", other),
    }
}

#[test]
fn call_to_undeclared_subworkflow() {
    match compile_err("workflow main() { r = undeclared(a = 1) }") {
        CompileError::Validation(e) => {
            assert!(e.has(ValidatorKind::MissingJumpTarget));
            assert_eq!(e.issues.len(), 1);
        }
        other => panic!("expected WorkflowValidationError, got {:?}", other),
    }
}

#[test]
fn counters_continue_across_subworkflows() {
    let doc = compile_ok("workflow a() { x = 1 } workflow b() { y = 2 }");
    assert_eq!(step_names(&doc, "a"), vec!["assign1"]);
    assert_eq!(step_names(&doc, "b"), vec!["assign2"]);
}

#[test]
fn compilation_is_deterministic() {
    let src = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../../samples/control_flow.wfs"))
        .unwrap();
    let first = compile_to_yaml(&src, &CompileOptions::default()).unwrap();
    let second = compile_to_yaml(&src, &CompileOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn disabling_one_validator_keeps_the_others() {
    let duplicated: Value = json!({
        "main": {"steps": [{"call1": {"call": "main"}}]}
    });
    let src = "workflow main() { main() } workflow main() { r = nowhere(a = 1) }";

    let only_jumps = CompileOptions::new().disable(ValidatorKind::DuplicatedSubworkflowName);
    match compile(src, &only_jumps) {
        Err(CompileError::Validation(e)) => {
            assert!(!e.has(ValidatorKind::DuplicatedSubworkflowName));
            assert!(e.has(ValidatorKind::MissingJumpTarget));
        }
        other => panic!("expected WorkflowValidationError, got {:?}", other),
    }

    let none = only_jumps.disable(ValidatorKind::MissingJumpTarget);
    let doc = compile("workflow main() { main() }", &none).unwrap();
    assert_eq!(doc, duplicated);
}

/// `main` holds two steps named `a`, one of them calling an undeclared
/// subworkflow.
fn program_with_repeated_step_name() -> NamedProgram {
    let step = |step: WorkflowStep| NamedWorkflowStep {
        name: "a".to_owned(),
        step,
    };
    Program {
        subworkflows: vec![Subworkflow {
            name: "main".to_owned(),
            params: Vec::new(),
            steps: vec![
                step(WorkflowStep::Assign(AssignStep {
                    assignments: vec![("x".to_owned(), Expression::variable("y"))],
                })),
                step(WorkflowStep::Call(CallStep {
                    call: "nowhere".to_owned(),
                    args: Vec::new(),
                    result: None,
                })),
            ],
        }],
    }
}

#[test]
fn duplicated_step_names_can_be_disabled() {
    let program = program_with_repeated_step_name();

    let err = validate(&program, &BTreeSet::new()).unwrap_err();
    assert!(err.has(ValidatorKind::DuplicatedStepName));
    assert!(err.has(ValidatorKind::MissingJumpTarget));

    let disabled: BTreeSet<_> = [ValidatorKind::DuplicatedStepName].into();
    let err = validate(&program, &disabled).unwrap_err();
    let kinds: Vec<ValidatorKind> = err.issues.iter().map(|i| i.kind).collect();
    assert_eq!(kinds, vec![ValidatorKind::MissingJumpTarget]);

    let disabled: BTreeSet<_> = [ValidatorKind::DuplicatedStepName, ValidatorKind::MissingJumpTarget].into();
    assert!(validate(&program, &disabled).is_ok());
}

#[test]
fn empty_call_can_start_an_expression() {
    let doc = compile_ok("workflow main() { x = sys.now() + 1 }");
    assert_eq!(
        doc["main"]["steps"][0],
        json!({"assign1": {"assign": [{"x": "${sys.now() + 1}"}]}})
    );
}

#[test]
fn exponent_integers_render_as_integers() {
    let doc = compile_ok("workflow main() { a = 1e3 b = 1e3 + 1 }");
    assert_eq!(
        doc["main"]["steps"][0]["assign1"]["assign"],
        json!([{"a": 1000}, {"b": "${1000 + 1}"}])
    );
}

#[test]
fn every_validation_issue_is_reported() {
    let src = "workflow main() { r = helper(b = 1) s = ghost() } workflow helper(a) { } workflow helper(a) { }";
    match compile_err(src) {
        CompileError::Validation(e) => {
            assert!(e.has(ValidatorKind::DuplicatedSubworkflowName));
            assert!(e.has(ValidatorKind::MissingJumpTarget));
            assert!(e.has(ValidatorKind::WrongNumberOfCallArguments));
            let json = CompileError::Validation(e).to_json_value();
            assert!(json["issues"].as_array().unwrap().len() >= 3);
        }
        other => panic!("expected WorkflowValidationError, got {:?}", other),
    }
}

#[test]
fn error_kinds_by_stage() {
    assert_eq!(compile_err("workflow main() { a = # }").kind(), "LexError");
    assert_eq!(compile_err("workflow main() { a = }").kind(), "ParseError");
    assert_eq!(compile_err("workflow main() { try { a = 1 } }").kind(), "PostParsingError");
    assert_eq!(compile_err("workflow main() { a[1.5] = 1 }").kind(), "PostParsingError");
}

#[test]
fn parse_error_reports_position() {
    let err = compile_err("workflow main() {\n  a = 1\n  if x { }\n}");
    let span = err.span().unwrap();
    assert_eq!(span.line, 3);
    assert_eq!(span.column, 6);
}

#[test]
fn complex_program() {
    let src = r#"
        workflow main(args) {
            items = args.items
            for (item in items) {
                if (item.skip) {
                    continue
                }
                res = http.post(url = "https://example.com", body = item)
                results[item.id] = process(data = res.body)
            }
            return results
        }
        workflow process(data, strict = false) {
            return data
        }
    "#;
    let doc = compile_ok(src);
    assert_eq!(doc["main"]["params"], json!(["args"]));
    assert_eq!(doc["process"]["params"], json!(["data", {"strict": false}]));
    assert_eq!(step_names(&doc, "main"), vec!["assign1", "for1", "return1"]);

    let body = &doc["main"]["steps"][1]["for1"]["for"];
    assert_eq!(body["value"], json!("item"));
    assert_eq!(body["in"], json!("${items}"));
    assert_eq!(
        body["steps"],
        json!([
            {"switch1": {"switch": [
                {"condition": "${item.skip}", "steps": [{"next1": {"next": "continue"}}]}
            ]}},
            {"call1": {"call": "http.post", "args": {"url": "https://example.com", "body": "${item}"}, "result": "res"}},
            {"call2": {"call": "process", "args": {"data": "${res.body}"}, "result": "__temp0"}},
            {"assign2": {"assign": [{"results[item.id]": "${__temp0}"}]}}
        ])
    );
    assert_eq!(doc["process"]["steps"], json!([{"return2": {"return": "${data}"}}]));
}
