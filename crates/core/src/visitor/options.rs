//! Parallel options and retry policies, both written as named parameters.

use super::expressions::NamedArgument;
use super::post_parsing;
use crate::ast::{Expression, Number, ParallelOptions, RetryPolicy};
use crate::error::{CompileError, SourceSpan};
use serde_json::Value;
use std::collections::BTreeSet;

const CUSTOM_RETRY_KEYS: [&str; 5] = [
    "predicate",
    "max_retries",
    "initial_delay",
    "max_delay",
    "multiplier",
];

fn reject_repeated(args: &[NamedArgument], what: &str) -> Result<(), CompileError> {
    let mut seen = BTreeSet::new();
    for arg in args {
        if !seen.insert(arg.name.as_str()) {
            return Err(post_parsing(
                format!("Duplicate {} parameter '{}'", what, arg.name),
                arg.span,
            ));
        }
    }
    Ok(())
}

fn literal_value(expression: &Expression) -> Option<Value> {
    expression
        .is_literal()
        .then(|| expression.to_literal_value_or_literal_expression())
}

pub(super) fn parallel_options(args: Vec<NamedArgument>) -> Result<ParallelOptions, CompileError> {
    reject_repeated(&args, "parallel")?;
    let mut options = ParallelOptions::default();
    for arg in args {
        match arg.name.as_str() {
            "shared" => options.shared = Some(shared_variables(&arg)?),
            "concurrency_limit" => {
                let limit = match literal_value(&arg.value) {
                    Some(Value::Number(n)) => n.as_i64(),
                    _ => None,
                };
                match limit {
                    Some(limit) => options.concurrency_limit = Some(limit),
                    None => {
                        return Err(post_parsing(
                            "Parallel parameter 'concurrency_limit' must be an integer",
                            arg.span,
                        ))
                    }
                }
            }
            "exception_policy" => match literal_value(&arg.value) {
                Some(Value::String(policy)) if policy == "continueAll" => {
                    options.exception_policy = Some(policy);
                }
                _ => {
                    return Err(post_parsing(
                        "Parallel parameter 'exception_policy' must be \"continueAll\"",
                        arg.span,
                    ))
                }
            },
            other => {
                return Err(post_parsing(
                    format!(
                        "Unknown parallel parameter '{}' (expected shared, concurrency_limit or exception_policy)",
                        other
                    ),
                    arg.span,
                ))
            }
        }
    }
    Ok(options)
}

fn shared_variables(arg: &NamedArgument) -> Result<Vec<String>, CompileError> {
    let invalid = || {
        post_parsing(
            "Parallel parameter 'shared' must be an array of variable name strings",
            arg.span,
        )
    };
    let Some(Value::Array(items)) = literal_value(&arg.value) else {
        return Err(invalid());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(invalid()),
        })
        .collect()
}

/// `retry(policy = http.default_retry)` or the five-key custom form.
pub(super) fn retry_policy(
    args: Vec<NamedArgument>,
    span: SourceSpan,
) -> Result<RetryPolicy, CompileError> {
    reject_repeated(&args, "retry")?;
    let keys: BTreeSet<&str> = args.iter().map(|a| a.name.as_str()).collect();

    if keys.len() == 1 && keys.contains("policy") {
        let arg = &args[0];
        return match arg.value.as_qualified_name() {
            Some(name) => Ok(RetryPolicy::Default(name.to_owned())),
            None => Err(post_parsing(
                "Retry parameter 'policy' must be a fully qualified name",
                arg.span,
            )),
        };
    }

    if keys != CUSTOM_RETRY_KEYS.into_iter().collect::<BTreeSet<_>>() {
        return Err(post_parsing(
            "Retry parameters must be either {policy} or \
             {predicate, max_retries, initial_delay, max_delay, multiplier}",
            span,
        ));
    }

    let find = |key: &str| args.iter().find(|a| a.name == key);
    let predicate = match find("predicate") {
        Some(arg) => arg.value.as_qualified_name().map(str::to_owned).ok_or_else(|| {
            post_parsing(
                "Retry parameter 'predicate' must be a fully qualified name",
                arg.span,
            )
        })?,
        None => return Err(post_parsing("Retry parameter 'predicate' is missing", span)),
    };
    let number = |key: &str| -> Result<Number, CompileError> {
        let arg = find(key).ok_or_else(|| {
            post_parsing(format!("Retry parameter '{}' is missing", key), span)
        })?;
        let value = match literal_value(&arg.value) {
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Number::Int)
                .or_else(|| n.as_f64().map(Number::Float)),
            _ => None,
        };
        value.ok_or_else(|| {
            post_parsing(
                format!("Retry parameter '{}' must be a number", key),
                arg.span,
            )
        })
    };

    Ok(RetryPolicy::Custom {
        predicate,
        max_retries: number("max_retries")?,
        initial_delay: number("initial_delay")?,
        max_delay: number("max_delay")?,
        multiplier: number("multiplier")?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::{post_parsing_message, steps_of};
    use crate::ast::*;

    fn parallel_options_of(src: &str) -> ParallelOptions {
        match steps_of(src).into_iter().next() {
            Some(WorkflowStepAst::Parallel(p)) => p.options,
            other => panic!("expected parallel, got {:?}", other),
        }
    }

    fn retry_of(src: &str) -> Option<RetryPolicy> {
        match steps_of(src).into_iter().next() {
            Some(WorkflowStepAst::Try(t)) => t.retry,
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn parallel_options_are_recognised() {
        let options = parallel_options_of(
            r#"parallel (shared = ["a", "b"], concurrency_limit = 2, exception_policy = "continueAll")
               branch { a = 1 } branch { b = 2 }"#,
        );
        assert_eq!(
            options,
            ParallelOptions {
                shared: Some(vec!["a".to_owned(), "b".to_owned()]),
                concurrency_limit: Some(2),
                exception_policy: Some("continueAll".to_owned()),
            }
        );
    }

    #[test]
    fn parallel_option_errors_name_the_key() {
        assert!(post_parsing_message("parallel (shared = [1]) branch { }").contains("'shared'"));
        assert!(post_parsing_message("parallel (concurrency_limit = 1.5) branch { }")
            .contains("'concurrency_limit'"));
        assert!(post_parsing_message(r#"parallel (exception_policy = "stop") branch { }"#)
            .contains("'exception_policy'"));
        assert!(post_parsing_message("parallel (colour = 1) branch { }").contains("'colour'"));
        assert!(post_parsing_message("parallel (concurrency_limit = 1, concurrency_limit = 2) branch { }")
            .starts_with("Duplicate parallel parameter"));
    }

    #[test]
    fn default_retry_policy() {
        assert_eq!(
            retry_of("try { a = 1 } retry (policy = http.default_retry)"),
            Some(RetryPolicy::Default("http.default_retry".to_owned()))
        );
    }

    #[test]
    fn custom_retry_policy() {
        let retry = retry_of(
            "try { a = 1 } retry (predicate = my_predicate, max_retries = 3, \
             initial_delay = 1, max_delay = 60, multiplier = 1.5)",
        );
        assert_eq!(
            retry,
            Some(RetryPolicy::Custom {
                predicate: "my_predicate".to_owned(),
                max_retries: Number::Int(3),
                initial_delay: Number::Int(1),
                max_delay: Number::Int(60),
                multiplier: Number::Float(1.5),
            })
        );
    }

    #[test]
    fn malformed_retry_parameters() {
        assert!(post_parsing_message("try { a = 1 } retry (policy = 1 + 2)")
            .contains("fully qualified name"));
        assert!(post_parsing_message("try { a = 1 } retry (max_retries = 3)")
            .contains("{policy}"));
        assert!(post_parsing_message(
            "try { a = 1 } retry (predicate = p, max_retries = x, initial_delay = 1, max_delay = 2, multiplier = 2)"
        )
        .contains("'max_retries'"));
        assert!(post_parsing_message("try { a = 1 } retry (policy = p, policy = q)")
            .starts_with("Duplicate retry parameter"));
    }
}
