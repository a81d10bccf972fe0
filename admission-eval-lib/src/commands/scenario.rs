//! Scenario files bundle an expression or policy with the documents it runs against.
//!
//! ```toml
//! mode = "policy"
//! policy = { path = "policy.yaml" }
//! object = """
//! replicas: 2
//! """
//! ```
//!
//! Every document is either inline text or a `{ path = "..." }` table naming a
//! file relative to the scenario file.

use super::Host;
use super::common::{DocumentTexts, OutputArgs, emit_expression, emit_report, fail, init_logging, read_file};
use crate::{Result, evaluate_expression, evaluate_policy, evaluate_webhook};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;
use strum::Display;

const LOG_TARGET: &str = "  scenario";

#[derive(Parser, Debug)]
pub struct ScenarioArgs {
    /// The scenario file to run
    #[arg(value_name = "PATH")]
    pub scenario: Utf8PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// What a scenario evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Cel,
    Policy,
    Webhook,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Source {
    Inline(String),
    File(FileSource),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSource {
    path: String,
}

impl Source {
    fn load(&self, base: &Utf8Path) -> Result<String> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(file) => read_file(&base.join(&file.path)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    mode: Mode,
    expression: Option<String>,
    bindings: Option<Source>,
    policy: Option<Source>,
    webhook: Option<Source>,
    object: Option<Source>,
    old_object: Option<Source>,
    namespace: Option<Source>,
    request: Option<Source>,
    authorizer: Option<Source>,
}

/// A scenario with every document loaded
#[derive(Debug, Clone)]
pub struct Scenario {
    pub mode: Mode,
    pub expression: String,
    pub bindings: Option<String>,
    pub document: Option<String>,
    pub texts: DocumentTexts,
}

impl Scenario {
    /// Load a scenario file and every document it names
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a referenced
    /// document cannot be read, or if a field the mode needs is missing
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = read_file(path)?;
        let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));
        Self::parse(&text, base).into_app_err_with(|| format!("loading scenario '{path}'"))
    }

    fn parse(text: &str, base: &Utf8Path) -> Result<Self> {
        let file: ScenarioFile = toml::from_str(text).into_app_err("parsing the scenario")?;

        let (expression, document) = match file.mode {
            Mode::Cel => (required(file.expression, file.mode, "expression")?, None),
            Mode::Policy => (String::new(), Some(required(file.policy, file.mode, "policy")?)),
            Mode::Webhook => (String::new(), Some(required(file.webhook, file.mode, "webhook")?)),
        };

        let load = |source: Option<Source>| source.map(|s| s.load(base)).transpose();

        Ok(Self {
            mode: file.mode,
            expression,
            bindings: load(file.bindings)?,
            document: document.map(|d| d.load(base)).transpose()?,
            texts: DocumentTexts {
                old_object: load(file.old_object)?,
                object: load(file.object)?,
                namespace: load(file.namespace)?,
                request: load(file.request)?,
                authorizer: load(file.authorizer)?,
            },
        })
    }
}

fn required<T>(value: Option<T>, mode: Mode, field: &str) -> Result<T> {
    value.ok_or_else(|| app_err!("a {mode} scenario requires the '{field}' field"))
}

pub fn process_scenario<H: Host>(host: &mut H, args: &ScenarioArgs) -> Result<()> {
    init_logging(args.output.log_level);

    let scenario = match Scenario::load(&args.scenario) {
        Ok(scenario) => scenario,
        Err(e) => return fail(host, e),
    };

    log::info!(target: LOG_TARGET, "Running {} scenario '{}'", scenario.mode, args.scenario);

    let document = scenario.document.as_deref().unwrap_or_default();
    let documents = scenario.texts.documents();

    let outcome = match scenario.mode {
        Mode::Cel => match evaluate_expression(&scenario.expression, scenario.bindings.as_deref().unwrap_or_default()) {
            Ok(result) => return emit_expression(host, &result, &args.output),
            Err(e) => Err(e),
        },
        Mode::Policy => evaluate_policy(document, &documents),
        Mode::Webhook => evaluate_webhook(document, &documents),
    };

    match outcome {
        Ok(report) => emit_report(host, &report, &args.output),
        Err(e) => fail(host, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::common::{ColorMode, LogLevel, OutputFormat};
    use crate::commands::host::TestHost;
    use std::fs;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn args(scenario: Utf8PathBuf) -> ScenarioArgs {
        ScenarioArgs {
            scenario,
            output: OutputArgs {
                format: OutputFormat::Json,
                color: ColorMode::Never,
                log_level: LogLevel::None,
            },
        }
    }

    #[test]
    fn test_inline_and_file_sources() {
        let (_guard, dir) = scratch();
        fs::write(dir.join("object.yaml"), "replicas: 2\n").unwrap();

        let scenario = Scenario::parse(
            r#"
mode = "policy"
policy = "kind: ValidatingAdmissionPolicy"
object = { path = "object.yaml" }
"#,
            &dir,
        )
        .unwrap();

        assert_eq!(scenario.mode, Mode::Policy);
        assert_eq!(scenario.document.as_deref(), Some("kind: ValidatingAdmissionPolicy"));
        assert_eq!(scenario.texts.object.as_deref(), Some("replicas: 2\n"));
        assert_eq!(scenario.texts.request, None);
    }

    #[test]
    fn test_missing_required_field() {
        let err = Scenario::parse("mode = \"cel\"\n", Utf8Path::new("")).unwrap_err();
        assert!(err.to_string().contains("a cel scenario requires the 'expression' field"));

        let err = Scenario::parse("mode = \"webhook\"\n", Utf8Path::new("")).unwrap_err();
        assert!(err.to_string().contains("a webhook scenario requires the 'webhook' field"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Scenario::parse("mode = \"cel\"\nexpression = \"1\"\nobjects = \"a: 1\"\n", Utf8Path::new("")).unwrap_err();
        assert!(err.to_string().contains("parsing the scenario"));
    }

    #[test]
    fn test_missing_referenced_file() {
        let (_guard, dir) = scratch();
        let err = Scenario::parse("mode = \"cel\"\nexpression = \"1\"\nbindings = { path = \"absent.yaml\" }\n", &dir).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_cel_scenario() {
        let (_guard, dir) = scratch();
        let path = dir.join("scenario.toml");
        fs::write(
            &path,
            r#"
mode = "cel"
expression = "'replicas: ' + string(object.replicas)"
bindings = """
object:
  replicas: 3
"""
"#,
        )
        .unwrap();

        let mut host = TestHost::default();
        process_scenario(&mut host, &args(path)).unwrap();
        assert_eq!(host.output_str(), "{\"result\":\"replicas: 3\",\"cost\":6}\n");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_policy_scenario() {
        let (_guard, dir) = scratch();
        fs::write(
            dir.join("policy.yaml"),
            r"
apiVersion: admissionregistration.k8s.io/v1
kind: ValidatingAdmissionPolicy
metadata:
  name: max-replicas
spec:
  validations:
    - expression: object.replicas <= 5
",
        )
        .unwrap();

        let path = dir.join("scenario.toml");
        fs::write(
            &path,
            "mode = \"policy\"\npolicy = { path = \"policy.yaml\" }\nobject = \"replicas: 10\"\n",
        )
        .unwrap();

        let mut host = TestHost::default();
        process_scenario(&mut host, &args(path)).unwrap();
        assert_eq!(host.output_str(), "{\"validations\":[{\"result\":false,\"cost\":5}],\"cost\":5}\n");
    }

    #[test]
    fn test_unreadable_scenario_exits() {
        let (_guard, dir) = scratch();
        let mut host = TestHost::default();
        let _ = process_scenario(&mut host, &args(dir.join("absent.toml"))).unwrap_err();
        assert_eq!(host.exit_code, Some(1));
    }
}
