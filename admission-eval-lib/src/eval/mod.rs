//! Admission policy evaluation
//!
//! A policy run builds two [`EvaluationContext`]s, one for match conditions and
//! one for validations and audit annotations, each with its own set of lazily
//! evaluated variables. Every clause is compiled before any of them runs, so a
//! parse error aborts the run without a partial report. Runtime failures of
//! single clauses are recorded in the [`EvaluationReport`] and evaluation goes on.
//!
//! Webhook configurations only carry match conditions; each webhook entry is
//! evaluated independently against a single match-condition context.

mod context;
mod lazy_variable;
mod policy;
mod report;
mod webhook;

pub use context::{EvaluationContext, Scope, resolve_request_resource};
pub use lazy_variable::{LazyVariable, Resolution, VariableSet};
pub use policy::evaluate_policy;
pub use report::{ClauseOutcome, EvaluationReport, Status, VariableOutcome};
pub use webhook::evaluate_webhook;
