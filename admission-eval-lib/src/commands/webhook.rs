use super::Host;
use super::common::{DocumentArgs, DocumentTexts, OutputArgs, emit_report, fail, init_logging, read_file};
use crate::{Result, evaluate_webhook};
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct WebhookArgs {
    /// The validating or mutating webhook configuration to evaluate
    #[arg(value_name = "WEBHOOK")]
    pub webhook: Utf8PathBuf,

    #[command(flatten)]
    pub documents: DocumentArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn process_webhook<H: Host>(host: &mut H, args: &WebhookArgs) -> Result<()> {
    init_logging(args.output.log_level);

    let outcome = read_file(&args.webhook).and_then(|webhook| {
        let texts = DocumentTexts::read(&args.documents)?;
        evaluate_webhook(&webhook, &texts.documents())
    });

    match outcome {
        Ok(report) => emit_report(host, &report, &args.output),
        Err(e) => fail(host, e),
    }
}
