//! Drive the command-line interface end to end through a capturing host.

use admission_eval_lib::Host;
use std::io::Write;

#[derive(Default)]
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
    exit_code: Option<i32>,
}

impl TestHost {
    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn policy_command_renders_console_report() {
    let mut host = TestHost::default();
    admission_eval_lib::run(
        &mut host,
        [
            "admission-eval",
            "policy",
            "tests/fixtures/replica-limit-with-message.yaml",
            "--object",
            "tests/fixtures/deployment-large.yaml",
            "--color",
            "never",
        ],
    )
    .unwrap();

    insta::assert_snapshot!(host.output_str().trim_end(), @r"
    Validations
      ✘ #1 [cost 11]: replicas: 10
    Total cost: 11
    ");
}

#[test]
#[cfg_attr(miri, ignore)]
fn webhook_command_renders_json() {
    let mut host = TestHost::default();
    admission_eval_lib::run(
        &mut host,
        [
            "admission-eval",
            "webhook",
            "tests/fixtures/webhooks.yaml",
            "--object",
            "tests/fixtures/deployment-large.yaml",
            "--request",
            "tests/fixtures/request.yaml",
            "--format",
            "json",
        ],
    )
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&host.output_str()).unwrap();
    assert_eq!(report["webhookMatchConditions"].as_array().map(Vec::len), Some(2));
    assert_eq!(host.exit_code, None);
}

#[test]
#[cfg_attr(miri, ignore)]
fn rejected_policy_exits_when_asked() {
    let mut host = TestHost::default();
    let _ = admission_eval_lib::run(
        &mut host,
        [
            "admission-eval",
            "policy",
            "tests/fixtures/replica-limit.yaml",
            "--object",
            "tests/fixtures/deployment-large.yaml",
            "--format",
            "json",
            "--error-if-rejected",
        ],
    )
    .unwrap_err();

    assert_eq!(host.exit_code, Some(1));
}

#[test]
fn missing_input_file_exits() {
    let mut host = TestHost::default();
    let _ = admission_eval_lib::run(
        &mut host,
        ["admission-eval", "policy", "tests/fixtures/replica-limit.yaml", "--object", "tests/fixtures/absent.yaml"],
    )
    .unwrap_err();

    assert_eq!(host.exit_code, Some(1));
    assert!(String::from_utf8_lossy(&host.error_buf).contains("absent.yaml"));
}
