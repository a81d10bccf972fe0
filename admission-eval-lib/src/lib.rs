#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for admission-eval
//!
//! This library evaluates Kubernetes admission policies and webhook match
//! conditions offline, against resource, namespace, request and authorizer
//! documents supplied by the caller.
//!
//! # Module Organization
//!
//! - [`admission`]: Policy documents and the context documents they run against
//! - [`authz`]: An emulated authorizer backed by a table of canned decisions
//! - [`expr`]: Expression compilation, execution and cost estimation
//! - [`eval`]: Policy and webhook evaluation producing an [`EvaluationReport`]
//! - [`reports`]: Report rendering
//! - [`commands`]: Command-line interface

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod admission;
#[cfg(not(any(debug_assertions, test)))]
mod admission;

#[cfg(any(debug_assertions, test))]
pub mod authz;
#[cfg(not(any(debug_assertions, test)))]
mod authz;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod eval;
#[cfg(not(any(debug_assertions, test)))]
mod eval;

#[cfg(any(debug_assertions, test))]
pub mod expr;
#[cfg(not(any(debug_assertions, test)))]
mod expr;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::admission::Documents;
pub use crate::commands::{Host, run};
pub use crate::eval::EvaluationReport;
pub use crate::expr::ExpressionResult;

use crate::admission::{Inputs, PolicyDocument};
use ohno::{IntoAppError, app_err};
use serde_json::Value as JsonValue;

/// Evaluate a single expression against a YAML or JSON mapping of bindings
///
/// # Errors
///
/// Returns an error if the bindings are not a mapping, or if the expression
/// cannot be compiled, fails at runtime, or yields a value with no document form
pub fn evaluate_expression(expression: &str, bindings: &str) -> Result<ExpressionResult> {
    let bindings = if bindings.trim().is_empty() {
        JsonValue::Null
    } else {
        serde_yaml::from_str(bindings).into_app_err("failed to decode the bindings")?
    };

    let bindings = match bindings {
        JsonValue::Object(fields) => fields,
        JsonValue::Null => serde_json::Map::new(),
        _ => return Err(app_err!("failed to decode the bindings: expected a mapping")),
    };

    expr::evaluate(expression, &bindings)
}

/// Evaluate a `ValidatingAdmissionPolicy` against a set of context documents
///
/// # Errors
///
/// Returns an error if a document cannot be decoded or an expression cannot be compiled
pub fn evaluate_policy(policy: &str, documents: &Documents<'_>) -> Result<EvaluationReport> {
    let policy = PolicyDocument::parse_policy(policy)?;
    let inputs = Inputs::parse(documents)?;
    eval::evaluate_policy(&policy, &inputs)
}

/// Evaluate the match conditions of every webhook in a webhook configuration
///
/// # Errors
///
/// Returns an error if a document cannot be decoded or an expression cannot be compiled
pub fn evaluate_webhook(webhook: &str, documents: &Documents<'_>) -> Result<EvaluationReport> {
    let webhook = PolicyDocument::parse_webhook(webhook)?;
    let inputs = Inputs::parse(documents)?;
    eval::evaluate_webhook(&webhook, &inputs)
}
