//! Compiled expressions and their execution

use super::tokens::{self, ReferenceForm, VariableReference};
use crate::Result;
use cel_interpreter::{Context, Program, Value};
use ohno::app_err;
use std::sync::Arc;

/// The function that reads of declared variables are compiled into
///
/// The interpreter only calls a function when evaluation reaches it, so a
/// variable behind a branch that is not taken is never resolved.
pub const VARIABLE_FUNCTION: &str = "_variable";

/// An expression compiled against an [`Environment`](super::Environment)
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    program: Arc<Program>,
    variables: Vec<String>,
    cost: u64,
}

/// The outcome of running a compiled expression once
#[derive(Debug, Clone)]
pub struct Execution {
    pub value: Result<Value, String>,
    pub cost: u64,
}

impl CompiledExpression {
    /// Compile `source`, routing reads of the variables that satisfy `is_declared` through [`VARIABLE_FUNCTION`]
    ///
    /// # Errors
    ///
    /// Returns an error if the expression cannot be parsed
    pub(super) fn compile(source: &str, is_declared: impl Fn(&str) -> bool) -> Result<Self> {
        let references: Vec<_> = tokens::variable_references(source)
            .into_iter()
            .filter(|r| is_declared(&r.name))
            .collect();

        let program = Program::compile(&route_variable_reads(source, &references))
            .map_err(|e| app_err!("failed to parse expression {source}: {e}"))?;

        let mut variables: Vec<String> = Vec::new();
        for reference in references {
            if reference.form == ReferenceForm::Read && !variables.contains(&reference.name) {
                variables.push(reference.name);
            }
        }

        Ok(Self {
            source: source.to_string(),
            program: Arc::new(program),
            variables,
            cost: tokens::estimate_cost(source),
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared variables this expression reads, in order of first appearance
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    #[must_use]
    pub const fn cost(&self) -> u64 {
        self.cost
    }

    /// Run the expression against a set of bindings
    ///
    /// Runtime failures are folded into the returned [`Execution`]; the cost is
    /// charged whether or not the run succeeds.
    #[must_use]
    pub fn execute(&self, context: &Context<'_>) -> Execution {
        let value = self
            .program
            .execute(context)
            .map_err(|e| format!("Unexpected error evaluating expression {}: {e}", self.source));

        Execution { value, cost: self.cost }
    }
}

/// Replace each variable read with a call that resolves it, and each presence test with `true`
fn route_variable_reads(source: &str, references: &[VariableReference]) -> String {
    let mut routed = String::with_capacity(source.len());
    let mut copied = 0;

    for reference in references {
        routed.push_str(source.get(copied..reference.range.start).unwrap_or_default());
        match reference.form {
            ReferenceForm::Read => routed.push_str(&format!("{VARIABLE_FUNCTION}('{}')", reference.name)),
            ReferenceForm::Presence => routed.push_str("true"),
        }
        copied = reference.range.end;
    }

    routed.push_str(source.get(copied..).unwrap_or_default());
    routed
}
