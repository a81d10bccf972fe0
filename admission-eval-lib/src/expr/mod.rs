//! Expression evaluation using CEL
//!
//! This module adapts the `cel-interpreter` crate to the needs of admission
//! evaluation. The interpreter compiles and executes expressions; this layer
//! adds what the admission protocol expects from an evaluator and the crate
//! does not provide:
//!
//! - [`Environment`]: an immutable set of declared names. Extending it yields a
//!   new environment, so environments built for concurrent runs never share
//!   mutable state.
//! - [`CompiledExpression`]: a compiled program together with the
//!   `variables.<name>` references it makes and an estimated cost.
//! - Conversion between plain documents and interpreter values.
//! - The Kubernetes function library: string extensions, list helpers,
//!   regular expressions, resource quantities and URLs.
//!
//! # Variables
//!
//! Reads of `variables.<name>` and `variables['<name>']` are rewritten at
//! compile time into calls to [`VARIABLE_FUNCTION`]. A variable is therefore
//! resolved only when evaluation reaches the read, and branches that are never
//! taken never evaluate the variables they mention.
//!
//! # Cost
//!
//! The interpreter does not track execution cost. Each expression is instead
//! assigned a deterministic estimate when compiled: one unit per identifier,
//! literal, operator, member selection or call in its source. The estimate is
//! charged each time the expression is executed.

mod environment;
mod evaluator;
mod expression;
mod library;
mod tokens;
mod value;

pub use environment::{Declaration, Environment};
pub use evaluator::{ExpressionResult, evaluate};
pub use expression::{CompiledExpression, Execution, VARIABLE_FUNCTION};
pub use library::register as register_library;
pub use value::{map_member, to_cel, to_json};
