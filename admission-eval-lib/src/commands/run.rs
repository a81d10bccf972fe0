//! Command dispatch logic for admission-eval

use super::{EvalArgs, PolicyArgs, ScenarioArgs, WebhookArgs, process_expression, process_policy, process_scenario, process_webhook};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "admission-eval", author, version, long_about = None)]
#[command(about = "Evaluate Kubernetes admission policies and webhook match conditions offline")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a single expression
    Eval(EvalArgs),
    /// Evaluate a ValidatingAdmissionPolicy
    Policy(Box<PolicyArgs>),
    /// Evaluate the match conditions of a webhook configuration
    Webhook(Box<WebhookArgs>),
    /// Run a scenario file
    Scenario(ScenarioArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if the executed command fails
pub fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        Command::Eval(args) => process_expression(host, args),
        Command::Policy(args) => process_policy(host, args),
        Command::Webhook(args) => process_webhook(host, args),
        Command::Scenario(args) => process_scenario(host, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_run_eval() {
        let mut host = TestHost::default();
        run(&mut host, ["admission-eval", "eval", "1 + 2", "--format", "json"]).unwrap();
        assert_eq!(host.output_str(), "{\"result\":3,\"cost\":3}\n");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_run_eval_console() {
        let mut host = TestHost::default();
        run(&mut host, ["admission-eval", "eval", "'a' + 'b'", "--color", "never"]).unwrap();
        assert_eq!(host.output_str(), "ab\nTotal cost: 3\n");
    }

    #[test]
    fn test_parse_policy_arguments() {
        let cli = Cli::try_parse_from([
            "admission-eval",
            "policy",
            "policy.yaml",
            "--object",
            "deploy.yaml",
            "--request",
            "request.yaml",
            "--format",
            "pretty",
            "--error-if-rejected",
        ])
        .unwrap();

        let Command::Policy(args) = cli.command else {
            unreachable!("expected the policy command");
        };
        assert_eq!(args.policy, "policy.yaml");
        assert_eq!(args.documents.object.as_deref().map(camino::Utf8Path::as_str), Some("deploy.yaml"));
        assert!(args.error_if_rejected);
    }
}
