use super::context::{EvaluationContext, Scope, resolve_request_resource};
use super::report::{ClauseOutcome, EvaluationReport};
use crate::Result;
use crate::admission::{Inputs, PolicyDocument};

const LOG_TARGET: &str = "   webhook";

/// Evaluate the match conditions of every webhook entry
///
/// Each webhook is evaluated independently and every one of its conditions
/// runs; whether a webhook applies is left to the reader of the report.
///
/// # Errors
///
/// Returns an error if the context cannot be built or an expression fails to parse
pub fn evaluate_webhook(webhook: &PolicyDocument, inputs: &Inputs) -> Result<EvaluationReport> {
    let request_resource = resolve_request_resource(inputs)?;
    let context = EvaluationContext::new(inputs, Scope::MatchConditions, request_resource.as_ref())?;

    let compiled = webhook
        .webhook_match_conditions
        .iter()
        .map(|conditions| {
            conditions
                .iter()
                .map(|c| Ok((c.name.as_str(), context.compile(&c.expression)?)))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let report = EvaluationReport {
        webhook_match_conditions: compiled
            .iter()
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|(name, expression)| ClauseOutcome::new(name, &context.execute(expression)))
                    .collect()
            })
            .collect(),
        ..EvaluationReport::default()
    }
    .finish();

    log::debug!(
        target: LOG_TARGET,
        "Evaluated {} webhook(s) with total cost {}",
        report.webhook_match_conditions.len(),
        report.cost
    );
    Ok(report)
}
