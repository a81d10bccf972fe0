use crate::expr::{Execution, to_json};
use serde::Serialize;
use serde_json::Value as JsonValue;
use strum::Display;

/// The outcome of one evaluated clause
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClauseOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,

    /// Estimated from the expression's tokens, see [`crate::expr`]
    pub cost: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<JsonValue>,
}

/// How a clause fared, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

impl ClauseOutcome {
    /// Record an execution, naming the clause unless `name` is empty
    #[must_use]
    pub fn new(name: &str, execution: &Execution) -> Self {
        let mut outcome = Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            cost: execution.cost,
            ..Self::default()
        };

        match &execution.value {
            Ok(value) => match to_json(value) {
                Ok(value) => outcome.result = Some(value),
                Err(e) => outcome.error = Some(e),
            },
            Err(e) => outcome.error = Some(e.clone()),
        }

        outcome
    }

    #[must_use]
    pub fn status(&self) -> Status {
        if self.error.is_some() {
            Status::Error
        } else if self.result == Some(JsonValue::Bool(true)) {
            Status::Pass
        } else {
            Status::Fail
        }
    }
}

/// A lazily evaluated variable that was actually evaluated
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableOutcome {
    pub name: String,
    pub value: JsonValue,
    pub cost: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything evaluated in one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_condition_variables: Vec<VariableOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<ClauseOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_variables: Vec<VariableOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ClauseOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audit_annotations: Vec<ClauseOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webhook_match_conditions: Vec<Vec<ClauseOutcome>>,

    /// The total cost of the run
    ///
    /// This is an estimate. Each expression is charged one unit per token of
    /// its source, not the runtime cost the API server would compute, so the
    /// figure is stable across runs but does not match a live cluster.
    pub cost: u64,
}

impl EvaluationReport {
    /// The sum of the costs of every outcome in the report
    #[must_use]
    pub fn total_cost(&self) -> u64 {
        let variables = self
            .match_condition_variables
            .iter()
            .chain(&self.validation_variables)
            .map(|v| v.cost);

        let clauses = self
            .match_conditions
            .iter()
            .chain(&self.validations)
            .chain(&self.audit_annotations)
            .chain(self.webhook_match_conditions.iter().flatten())
            .map(|c| c.cost);

        variables.chain(clauses).sum()
    }

    /// Set the top-level cost from the outcomes
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.cost = self.total_cost();
        self
    }
}
