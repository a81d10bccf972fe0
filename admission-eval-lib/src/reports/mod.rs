//! Report generation for evaluation results
//!
//! Two renderings are provided, each accessed through a `generate` function:
//! - **JSON**: the serialized report, compact or pretty-printed
//! - **Console**: a per-clause listing with pass / fail / error markers and
//!   ANSI colors when enabled

mod common;
mod console;
mod json;

pub use console::generate as generate_console;
pub use console::generate_expression as generate_console_expression;
pub use json::generate as generate_json;
