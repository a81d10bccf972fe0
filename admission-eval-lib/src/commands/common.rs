//! Argument groups and helpers shared between the evaluation commands.

use super::Host;
use crate::Result;
use crate::admission::Documents;
use crate::eval::EvaluationReport;
use crate::expr::ExpressionResult;
use crate::reports::{generate_console, generate_console_expression, generate_json};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// How results are written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on a single line
    Json,

    /// Indented JSON
    Pretty,

    /// A human-readable listing of every clause
    Console,
}

/// Output arguments shared by every command
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// How to format the result
    #[arg(long, value_name = "FORMAT", default_value = "console")]
    pub format: OutputFormat,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Paths of the context documents a policy or webhook runs against
#[derive(Args, Debug, Clone, Default)]
pub struct DocumentArgs {
    /// The new resource value, bound as `object`
    #[arg(long, value_name = "PATH", help_heading = "Context Documents")]
    pub object: Option<Utf8PathBuf>,

    /// The previous resource value, bound as `oldObject`
    #[arg(long, value_name = "PATH", help_heading = "Context Documents")]
    pub old_object: Option<Utf8PathBuf>,

    /// The namespace of the resource, bound as `namespaceObject`
    #[arg(long, value_name = "PATH", help_heading = "Context Documents")]
    pub namespace: Option<Utf8PathBuf>,

    /// The admission request, bound as `request`
    #[arg(long, value_name = "PATH", help_heading = "Context Documents")]
    pub request: Option<Utf8PathBuf>,

    /// A table of canned authorization decisions, consulted through `authorizer`
    #[arg(long, value_name = "PATH", help_heading = "Context Documents")]
    pub authorizer: Option<Utf8PathBuf>,
}

/// The text of the context documents, owned so [`Documents`] can borrow from it
#[derive(Debug, Clone, Default)]
pub struct DocumentTexts {
    pub old_object: Option<String>,
    pub object: Option<String>,
    pub namespace: Option<String>,
    pub request: Option<String>,
    pub authorizer: Option<String>,
}

impl DocumentTexts {
    /// Read every document named on the command line
    ///
    /// # Errors
    ///
    /// Returns an error if a named file cannot be read
    pub fn read(args: &DocumentArgs) -> Result<Self> {
        let read = |path: Option<&Utf8Path>| path.map(read_file).transpose();

        Ok(Self {
            old_object: read(args.old_object.as_deref())?,
            object: read(args.object.as_deref())?,
            namespace: read(args.namespace.as_deref())?,
            request: read(args.request.as_deref())?,
            authorizer: read(args.authorizer.as_deref())?,
        })
    }

    pub fn documents(&self) -> Documents<'_> {
        Documents {
            old_object: self.old_object.as_deref(),
            object: self.object.as_deref(),
            namespace: self.namespace.as_deref(),
            request: self.request.as_deref(),
            authorizer: self.authorizer.as_deref(),
        }
    }
}

/// Read a whole input file
///
/// # Errors
///
/// Returns an error if the file cannot be read
pub fn read_file(path: &Utf8Path) -> Result<String> {
    fs::read_to_string(path).into_app_err_with(|| format!("reading input file '{path}'"))
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when several commands run in one process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

fn use_colors(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            use std::io::{IsTerminal, stdout};
            stdout().is_terminal()
        }
    }
}

/// Write an evaluation report to the host's output
///
/// # Errors
///
/// Returns an error if the report cannot be rendered or written
pub fn emit_report<H: Host>(host: &mut H, report: &EvaluationReport, args: &OutputArgs) -> Result<()> {
    let mut text = String::new();
    match args.format {
        OutputFormat::Json => generate_json(report, false, &mut text)?,
        OutputFormat::Pretty => generate_json(report, true, &mut text)?,
        OutputFormat::Console => generate_console(report, use_colors(args.color), &mut text)?,
    }

    write!(host.output(), "{text}").into_app_err("writing the report")
}

/// Write the result of a single expression to the host's output
///
/// # Errors
///
/// Returns an error if the result cannot be rendered or written
pub fn emit_expression<H: Host>(host: &mut H, result: &ExpressionResult, args: &OutputArgs) -> Result<()> {
    let mut text = String::new();
    match args.format {
        OutputFormat::Json => generate_json(result, false, &mut text)?,
        OutputFormat::Pretty => generate_json(result, true, &mut text)?,
        OutputFormat::Console => generate_console_expression(result, use_colors(args.color), &mut text)?,
    }

    write!(host.output(), "{text}").into_app_err("writing the result")
}

/// Report a failed command on the host's error stream and exit with status 1
pub fn fail<H: Host, T>(host: &mut H, e: ohno::AppError) -> Result<T> {
    let _ = writeln!(host.error(), "❌ {e}");
    host.exit(1);
    Err(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use tempfile::TempDir;

    fn output_args(format: OutputFormat) -> OutputArgs {
        OutputArgs {
            format,
            color: ColorMode::Never,
            log_level: LogLevel::None,
        }
    }

    #[test]
    fn test_read_documents() {
        let dir = TempDir::new().unwrap();
        let object = Utf8PathBuf::from_path_buf(dir.path().join("object.yaml")).unwrap();
        fs::write(&object, "spec:\n  replicas: 2\n").unwrap();

        let texts = DocumentTexts::read(&DocumentArgs {
            object: Some(object),
            ..DocumentArgs::default()
        })
        .unwrap();

        let documents = texts.documents();
        assert_eq!(documents.object, Some("spec:\n  replicas: 2\n"));
        assert_eq!(documents.request, None);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file(Utf8Path::new("/nonexistent/object.yaml")).unwrap_err();
        assert!(err.to_string().contains("reading input file '/nonexistent/object.yaml'"));
    }

    #[test]
    fn test_emit_expression_formats() {
        let result = ExpressionResult {
            result: serde_json::json!(true),
            cost: 5,
        };

        let mut host = TestHost::default();
        emit_expression(&mut host, &result, &output_args(OutputFormat::Json)).unwrap();
        assert_eq!(host.output_str(), "{\"result\":true,\"cost\":5}\n");

        let mut host = TestHost::default();
        emit_expression(&mut host, &result, &output_args(OutputFormat::Console)).unwrap();
        assert_eq!(host.output_str(), "true\nTotal cost: 5\n");
    }

    #[test]
    fn test_fail_exits_with_one() {
        let mut host = TestHost::default();
        let result: Result<()> = fail(&mut host, ohno::AppError::new("boom"));
        let _ = result.unwrap_err();
        assert_eq!(host.exit_code, Some(1));
        assert!(host.error_str().contains("boom"));
    }
}
