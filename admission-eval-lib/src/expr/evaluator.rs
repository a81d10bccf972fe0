//! Single-expression evaluation outside of the admission protocol

use super::{Environment, register_library, to_cel, to_json};
use crate::Result;
use cel_interpreter::Context;
use ohno::app_err;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

const LOG_TARGET: &str = "      expr";

/// The result of evaluating a standalone expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionResult {
    pub result: JsonValue,
    pub cost: u64,
}

/// Evaluate one expression against a set of named bindings
///
/// Every top-level key of `bindings` becomes a variable visible to the expression.
///
/// # Errors
///
/// Returns an error if the expression cannot be parsed, fails at runtime, or
/// produces a value with no document representation
pub fn evaluate(expression: &str, bindings: &Map<String, JsonValue>) -> Result<ExpressionResult> {
    let env = Environment::with_bindings(bindings.keys().cloned())?;
    let compiled = env.compile(expression)?;
    let context = build_cel_context(bindings);

    let execution = compiled.execute(&context);
    log::debug!(target: LOG_TARGET, "Evaluated '{expression}' with cost {}", execution.cost);

    let value = execution.value.map_err(|e| app_err!("failed to evaluate: {e}"))?;
    let result = to_json(&value).map_err(|e| app_err!("failed to generate the response: {e}"))?;

    Ok(ExpressionResult {
        result,
        cost: execution.cost,
    })
}

fn build_cel_context(bindings: &Map<String, JsonValue>) -> Context<'static> {
    let mut context = Context::default();
    register_library(&mut context);
    for (name, value) in bindings {
        context.add_variable_from_value(name, to_cel(value));
    }
    context
}
