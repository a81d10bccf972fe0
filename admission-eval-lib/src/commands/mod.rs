//! Command-line interface for admission-eval
//!
//! # Commands
//!
//! - **eval**: Evaluate one expression against a mapping of bindings
//! - **policy**: Evaluate a `ValidatingAdmissionPolicy` against context documents
//! - **webhook**: Evaluate the match conditions of a webhook configuration
//! - **scenario**: Run a TOML scenario file bundling one of the above with its inputs
//!
//! Every command reads its documents from files, evaluates them through the
//! library entry points, and renders the result as JSON or as a console
//! listing. A failing command reports its error on the host's error stream
//! and exits with status 1.

mod common;
mod expression;
mod host;
mod policy;
mod run;
mod scenario;
mod webhook;

pub use common::{ColorMode, DocumentArgs, LogLevel, OutputArgs, OutputFormat};
pub use expression::{EvalArgs, process_expression};
pub use host::Host;
pub use policy::{PolicyArgs, process_policy};
pub use run::run;
pub use scenario::{Mode, Scenario, ScenarioArgs, process_scenario};
pub use webhook::{WebhookArgs, process_webhook};
