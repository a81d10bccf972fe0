use super::Host;
use super::common::{OutputArgs, emit_expression, fail, init_logging, read_file};
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// The expression to evaluate
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,

    /// A YAML or JSON mapping whose top-level keys become variables
    #[arg(long, value_name = "PATH")]
    pub bindings: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn process_expression<H: Host>(host: &mut H, args: &EvalArgs) -> Result<()> {
    init_logging(args.output.log_level);

    let outcome = args
        .bindings
        .as_deref()
        .map(read_file)
        .transpose()
        .and_then(|bindings| crate::evaluate_expression(&args.expression, bindings.as_deref().unwrap_or_default()));

    match outcome {
        Ok(result) => emit_expression(host, &result, &args.output),
        Err(e) => fail(host, e),
    }
}
