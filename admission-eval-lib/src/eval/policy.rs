//! The evaluation protocol of a `ValidatingAdmissionPolicy`
//!
//! Match conditions run first. Only when every one of them yields `true` do the
//! validations run, and only when every validation passes do the audit
//! annotations run. Clauses that do not run are absent from the report and add
//! nothing to its cost.

use super::context::{EvaluationContext, Scope, resolve_request_resource};
use super::report::{ClauseOutcome, EvaluationReport};
use crate::Result;
use crate::admission::{Inputs, PolicyDocument};
use crate::expr::{CompiledExpression, to_json};
use cel_interpreter::Value;
use serde_json::Value as JsonValue;

const LOG_TARGET: &str = "    policy";

struct CompiledClause {
    name: String,
    expression: CompiledExpression,
}

struct CompiledValidation {
    expression: CompiledExpression,
    message: String,
    message_expression: Option<CompiledExpression>,
}

/// Every expression of a policy, compiled before anything runs
struct CompiledPolicy {
    match_conditions: Vec<CompiledClause>,
    validations: Vec<CompiledValidation>,
    audit_annotations: Vec<CompiledClause>,
}

impl CompiledPolicy {
    fn compile(policy: &PolicyDocument, matches: &EvaluationContext, validations: &EvaluationContext) -> Result<Self> {
        let clause = |context: &EvaluationContext, name: &str, source: &str| -> Result<CompiledClause> {
            Ok(CompiledClause {
                name: name.to_string(),
                expression: context.compile(source)?,
            })
        };

        Ok(Self {
            match_conditions: policy
                .match_conditions
                .iter()
                .map(|c| clause(matches, &c.name, &c.expression))
                .collect::<Result<_>>()?,

            validations: policy
                .validations
                .iter()
                .map(|v| {
                    Ok(CompiledValidation {
                        expression: validations.compile(&v.expression)?,
                        message: v.message.clone(),
                        message_expression: if v.message_expression.is_empty() {
                            None
                        } else {
                            Some(validations.compile(&v.message_expression)?)
                        },
                    })
                })
                .collect::<Result<_>>()?,

            audit_annotations: policy
                .audit_annotations
                .iter()
                .map(|a| clause(validations, &a.key, &a.expression))
                .collect::<Result<_>>()?,
        })
    }
}

/// Evaluate a policy against decoded inputs
///
/// # Errors
///
/// Returns an error if the context cannot be built, a variable cannot be
/// declared, or an expression fails to parse. Failures while running
/// individual clauses are recorded in the report instead.
pub fn evaluate_policy(policy: &PolicyDocument, inputs: &Inputs) -> Result<EvaluationReport> {
    log::debug!(target: LOG_TARGET, "Evaluating policy '{}'", policy.name);

    let request_resource = resolve_request_resource(inputs)?;

    let mut matches = EvaluationContext::new(inputs, Scope::MatchConditions, request_resource.as_ref())?;
    let mut validations = EvaluationContext::new(inputs, Scope::Validations, request_resource.as_ref())?;
    matches.declare_variables(&policy.variables)?;
    validations.declare_variables(&policy.variables)?;

    let compiled = CompiledPolicy::compile(policy, &matches, &validations)?;
    let mut report = EvaluationReport::default();

    let matched = run_match_conditions(&compiled.match_conditions, &matches, &mut report.match_conditions);
    if matched {
        let passed = run_validations(&compiled.validations, &validations, &mut report.validations);
        if passed {
            report.audit_annotations = compiled
                .audit_annotations
                .iter()
                .map(|a| audit_annotation(a, &validations))
                .collect();
        } else {
            log::debug!(target: LOG_TARGET, "Skipping audit annotations, not every validation passed");
        }
    } else {
        log::debug!(target: LOG_TARGET, "Skipping validations, the match conditions were not met");
    }

    report.match_condition_variables = matches.variable_outcomes();
    report.validation_variables = validations.variable_outcomes();

    let report = report.finish();
    log::debug!(target: LOG_TARGET, "Policy '{}' evaluated with total cost {}", policy.name, report.cost);
    Ok(report)
}

/// Record every match condition and report whether they all held
///
/// Only a condition that evaluates to something other than `true` clears the
/// aggregate; a condition that fails to evaluate is recorded but leaves it as is.
fn run_match_conditions(clauses: &[CompiledClause], context: &EvaluationContext, outcomes: &mut Vec<ClauseOutcome>) -> bool {
    let mut matched = true;
    for clause in clauses {
        let execution = context.execute(&clause.expression);
        if let Ok(value) = &execution.value {
            matched = matched && *value == Value::Bool(true);
        }
        outcomes.push(ClauseOutcome::new(&clause.name, &execution));
    }
    matched
}

/// Record every validation and report whether they all passed
///
/// A validation that fails to evaluate counts as not passed, so an erroring
/// validation also keeps the audit annotations from running.
fn run_validations(validations: &[CompiledValidation], context: &EvaluationContext, outcomes: &mut Vec<ClauseOutcome>) -> bool {
    let mut passed = true;
    for validation in validations {
        let execution = context.execute(&validation.expression);
        let mut outcome = ClauseOutcome::new("", &execution);

        match &execution.value {
            Ok(Value::Bool(true)) => {}
            Ok(_) => {
                passed = false;
                resolve_message(validation, context, &mut outcome);
            }
            Err(_) => passed = false,
        }

        outcomes.push(outcome);
    }
    passed
}

/// Attach the message of a failed validation, preferring the static message
///
/// When the message expression fails, the validation keeps its `false` result
/// and the failure is recorded in `error` beside it.
fn resolve_message(validation: &CompiledValidation, context: &EvaluationContext, outcome: &mut ClauseOutcome) {
    if !validation.message.is_empty() {
        outcome.message = Some(JsonValue::String(validation.message.clone()));
        return;
    }

    let Some(expression) = &validation.message_expression else {
        return;
    };

    let execution = context.execute(expression);
    outcome.cost += execution.cost;
    match execution.value.as_ref().map_err(Clone::clone).and_then(to_json) {
        Ok(message) => outcome.message = Some(message),
        Err(e) => outcome.error = Some(e),
    }
}

fn audit_annotation(annotation: &CompiledClause, context: &EvaluationContext) -> ClauseOutcome {
    let mut outcome = ClauseOutcome::new(&annotation.name, &context.execute(&annotation.expression));
    outcome.message = outcome.result.take();
    outcome
}
