//! Rendering of the named step tree into the workflow document.
//!
//! The document is a `serde_json::Value` with insertion-ordered maps; YAML
//! text is produced from it by `serde_yaml`.

use crate::ast::expressions::number_value;
use crate::ast::*;
use crate::error::CompileError;
use serde_json::{json, Map, Value};

/// `{name: {params?, steps}}` for every subworkflow, in source order.
pub fn render_program(program: &NamedProgram) -> Value {
    let mut document = Map::new();
    for sub in &program.subworkflows {
        let mut body = Map::new();
        if !sub.params.is_empty() {
            let params = sub.params.iter().map(render_parameter).collect();
            body.insert("params".to_owned(), Value::Array(params));
        }
        body.insert("steps".to_owned(), render_steps(&sub.steps));
        document.insert(sub.name.clone(), Value::Object(body));
    }
    Value::Object(document)
}

fn render_parameter(param: &WorkflowParameter) -> Value {
    match &param.default {
        None => json!(param.name),
        Some(default) => {
            let mut m = Map::new();
            m.insert(param.name.clone(), default.to_value());
            Value::Object(m)
        }
    }
}

/// A step list: one single-key map `{name: body}` per step.
pub fn render_steps(steps: &[NamedWorkflowStep]) -> Value {
    Value::Array(
        steps
            .iter()
            .map(|s| {
                let mut m = Map::new();
                m.insert(s.name.clone(), render_step(&s.step));
                Value::Object(m)
            })
            .collect(),
    )
}

fn expression_string(name: &str) -> Value {
    Value::String(format!("${{{}}}", name))
}

fn render_assignments(assignments: &Assignments) -> Value {
    Value::Array(
        assignments
            .iter()
            .map(|(name, value)| {
                let mut m = Map::new();
                m.insert(name.clone(), value.to_literal_value_or_literal_expression());
                Value::Object(m)
            })
            .collect(),
    )
}

fn render_for(f: &ForStep<NamedWorkflowStep>) -> Value {
    let mut m = Map::new();
    m.insert("value".to_owned(), json!(f.value));
    if let Some(index) = &f.index {
        m.insert("index".to_owned(), json!(index));
    }
    match &f.iterable {
        ForIterable::In(e) => {
            m.insert("in".to_owned(), e.to_literal_value_or_literal_expression());
        }
        ForIterable::Range(start, end) => {
            m.insert(
                "range".to_owned(),
                Value::Array(vec![number_value(*start), number_value(*end)]),
            );
        }
    }
    m.insert("steps".to_owned(), render_steps(&f.steps));
    Value::Object(m)
}

fn render_parallel(p: &ParallelStep<NamedWorkflowStep>) -> Value {
    let mut m = Map::new();
    if let Some(shared) = &p.options.shared {
        m.insert("shared".to_owned(), json!(shared));
    }
    if let Some(limit) = p.options.concurrency_limit {
        m.insert("concurrency_limit".to_owned(), json!(limit));
    }
    if let Some(policy) = &p.options.exception_policy {
        m.insert("exception_policy".to_owned(), json!(policy));
    }
    match &p.body {
        ParallelBody::Branches(branches) => {
            m.insert("branches".to_owned(), render_steps(branches));
        }
        ParallelBody::For(f) => {
            m.insert("for".to_owned(), render_for(f));
        }
    }
    Value::Object(m)
}

fn render_switch(s: &SwitchStep<NamedWorkflowStep>) -> Map<String, Value> {
    let branches = s
        .branches
        .iter()
        .map(|b| {
            let mut m = Map::new();
            m.insert(
                "condition".to_owned(),
                b.condition.to_literal_value_or_literal_expression(),
            );
            if !b.steps.is_empty() {
                m.insert("steps".to_owned(), render_steps(&b.steps));
            }
            if let Some(next) = &b.next {
                m.insert("next".to_owned(), json!(next));
            }
            Value::Object(m)
        })
        .collect();

    let mut m = Map::new();
    m.insert("switch".to_owned(), Value::Array(branches));
    if let Some(next) = &s.next {
        m.insert("next".to_owned(), json!(next));
    }
    m
}

fn render_retry(retry: &RetryPolicy) -> Value {
    match retry {
        RetryPolicy::Default(policy) => expression_string(policy),
        RetryPolicy::Custom {
            predicate,
            max_retries,
            initial_delay,
            max_delay,
            multiplier,
        } => {
            let mut backoff = Map::new();
            backoff.insert("initial_delay".to_owned(), number_value(*initial_delay));
            backoff.insert("max_delay".to_owned(), number_value(*max_delay));
            backoff.insert("multiplier".to_owned(), number_value(*multiplier));

            let mut m = Map::new();
            m.insert("predicate".to_owned(), expression_string(predicate));
            m.insert("max_retries".to_owned(), number_value(*max_retries));
            m.insert("backoff".to_owned(), Value::Object(backoff));
            Value::Object(m)
        }
    }
}

fn render_try(t: &TryStep<NamedWorkflowStep>) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("try".to_owned(), json!({ "steps": render_steps(&t.try_steps) }));
    if let Some(retry) = &t.retry {
        m.insert("retry".to_owned(), render_retry(retry));
    }
    if let Some(error_var) = &t.error_var {
        if !t.except_steps.is_empty() {
            let mut except = Map::new();
            except.insert("as".to_owned(), json!(error_var));
            except.insert("steps".to_owned(), render_steps(&t.except_steps));
            m.insert("except".to_owned(), Value::Object(except));
        }
    }
    m
}

/// The body of one step.
pub fn render_step(step: &WorkflowStep) -> Value {
    let mut m = Map::new();
    match step {
        WorkflowStep::Switch(s) => return Value::Object(render_switch(s)),
        WorkflowStep::Try(t) => return Value::Object(render_try(t)),
        WorkflowStep::Assign(a) => {
            m.insert("assign".to_owned(), render_assignments(&a.assignments));
        }
        WorkflowStep::Call(c) => {
            m.insert("call".to_owned(), json!(c.call));
            if !c.args.is_empty() {
                let mut args = Map::new();
                for (name, value) in &c.args {
                    args.insert(name.clone(), value.to_literal_value_or_literal_expression());
                }
                m.insert("args".to_owned(), Value::Object(args));
            }
            if let Some(result) = &c.result {
                m.insert("result".to_owned(), json!(result));
            }
        }
        WorkflowStep::For(f) => {
            m.insert("for".to_owned(), render_for(f));
        }
        WorkflowStep::Next(n) => {
            m.insert("next".to_owned(), json!(n.target));
        }
        WorkflowStep::Parallel(p) => {
            m.insert("parallel".to_owned(), render_parallel(p));
        }
        WorkflowStep::Raise(r) => {
            m.insert("raise".to_owned(), r.value.to_literal_value_or_literal_expression());
        }
        WorkflowStep::Return(r) => match &r.value {
            Some(value) => {
                m.insert("return".to_owned(), value.to_literal_value_or_literal_expression());
            }
            None => {
                m.insert("next".to_owned(), json!("end"));
            }
        },
        WorkflowStep::Steps(s) => {
            m.insert("steps".to_owned(), render_steps(&s.steps));
        }
    }
    Value::Object(m)
}

/// Serialize a rendered document as YAML text.
pub fn to_yaml(document: &Value) -> Result<String, CompileError> {
    serde_yaml::to_string(document).map_err(|e| CompileError::Yaml(e.to_string()))
}
