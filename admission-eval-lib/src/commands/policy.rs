use super::Host;
use super::common::{DocumentArgs, DocumentTexts, OutputArgs, emit_report, fail, init_logging, read_file};
use crate::eval::{EvaluationReport, Status};
use crate::{Result, evaluate_policy};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::app_err;

#[derive(Parser, Debug)]
pub struct PolicyArgs {
    /// The `ValidatingAdmissionPolicy` to evaluate
    #[arg(value_name = "POLICY")]
    pub policy: Utf8PathBuf,

    #[command(flatten)]
    pub documents: DocumentArgs,

    /// Exit with status code 1 if the request matches and any validation does not pass
    #[arg(long)]
    pub error_if_rejected: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn process_policy<H: Host>(host: &mut H, args: &PolicyArgs) -> Result<()> {
    init_logging(args.output.log_level);

    let outcome = read_file(&args.policy).and_then(|policy| {
        let texts = DocumentTexts::read(&args.documents)?;
        evaluate_policy(&policy, &texts.documents())
    });

    let report = match outcome {
        Ok(report) => report,
        Err(e) => return fail(host, e),
    };

    emit_report(host, &report, &args.output)?;

    if args.error_if_rejected && rejects(&report) {
        return fail(host, app_err!("the policy rejected the request"));
    }

    Ok(())
}

/// Whether a policy run would deny the request
///
/// Validations only run when every match condition held, so their presence
/// means the request matched.
fn rejects(report: &EvaluationReport) -> bool {
    report.validations.iter().any(|v| v.status() != Status::Pass)
}
