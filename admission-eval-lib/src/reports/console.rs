use super::common;
use crate::Result;
use crate::eval::{ClauseOutcome, EvaluationReport, Status, VariableOutcome};
use crate::expr::ExpressionResult;
use core::fmt::Write;
use owo_colors::OwoColorize;

pub fn generate<W: Write>(report: &EvaluationReport, use_colors: bool, writer: &mut W) -> Result<()> {
    let mut printer = Printer { writer, use_colors };

    printer.variables("Match condition variables", &report.match_condition_variables)?;
    printer.clauses("Match conditions", &report.match_conditions, ClauseLabel::Name)?;
    printer.variables("Validation variables", &report.validation_variables)?;
    printer.clauses("Validations", &report.validations, ClauseLabel::Position)?;
    printer.annotations(&report.audit_annotations)?;

    for (index, webhook) in report.webhook_match_conditions.iter().enumerate() {
        printer.clauses(&format!("Webhook #{}", index + 1), webhook, ClauseLabel::Name)?;
    }

    printer.total(report.cost)
}

pub fn generate_expression<W: Write>(result: &ExpressionResult, use_colors: bool, writer: &mut W) -> Result<()> {
    let value = common::format_value(&result.result);
    if use_colors {
        writeln!(writer, "{}", value.bold())?;
    } else {
        writeln!(writer, "{value}")?;
    }

    Printer { writer, use_colors }.total(result.cost)
}

#[derive(Clone, Copy)]
enum ClauseLabel {
    Name,
    Position,
}

struct Printer<'a, W> {
    writer: &'a mut W,
    use_colors: bool,
}

impl<W: Write> Printer<'_, W> {
    fn heading(&mut self, title: &str) -> Result<()> {
        if self.use_colors {
            writeln!(self.writer, "{}", title.bold())?;
        } else {
            writeln!(self.writer, "{title}")?;
        }
        Ok(())
    }

    fn clauses(&mut self, title: &str, outcomes: &[ClauseOutcome], label: ClauseLabel) -> Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }

        self.heading(title)?;
        for (index, outcome) in outcomes.iter().enumerate() {
            let status = outcome.status();
            let marker = common::status_marker(status);
            let marker = if self.use_colors {
                match status {
                    Status::Pass => marker.green().to_string(),
                    Status::Fail => marker.red().to_string(),
                    Status::Error => marker.yellow().to_string(),
                }
            } else {
                marker.to_string()
            };

            let name = match (label, &outcome.name) {
                (_, Some(name)) => name.clone(),
                (ClauseLabel::Position, None) => format!("#{}", index + 1),
                (ClauseLabel::Name, None) => "(unnamed)".to_string(),
            };

            write!(self.writer, "  {marker} {name} [cost {}]", outcome.cost)?;
            if let Some(message) = &outcome.message {
                write!(self.writer, ": {}", common::format_value(message))?;
            }
            writeln!(self.writer)?;

            if let Some(error) = &outcome.error {
                writeln!(self.writer, "      {error}")?;
            }
        }
        Ok(())
    }

    fn annotations(&mut self, outcomes: &[ClauseOutcome]) -> Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }

        self.heading("Audit annotations")?;
        for outcome in outcomes {
            let key = outcome.name.as_deref().unwrap_or_default();
            match (&outcome.message, &outcome.error) {
                (_, Some(error)) => writeln!(self.writer, "  {key} [cost {}]: {error}", outcome.cost)?,
                (Some(value), None) => writeln!(self.writer, "  {key} = {} [cost {}]", common::format_value(value), outcome.cost)?,
                (None, None) => writeln!(self.writer, "  {key} [cost {}]", outcome.cost)?,
            }
        }
        Ok(())
    }

    fn variables(&mut self, title: &str, outcomes: &[VariableOutcome]) -> Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }

        self.heading(title)?;
        for outcome in outcomes {
            match &outcome.error {
                Some(error) => writeln!(self.writer, "  {} [cost {}]: {error}", outcome.name, outcome.cost)?,
                None => writeln!(
                    self.writer,
                    "  {} = {} [cost {}]",
                    outcome.name,
                    common::format_value(&outcome.value),
                    outcome.cost
                )?,
            }
        }
        Ok(())
    }

    fn total(&mut self, cost: u64) -> Result<()> {
        let line = format!("Total cost: {cost}");
        if self.use_colors {
            writeln!(self.writer, "{}", line.dimmed())?;
        } else {
            writeln!(self.writer, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> EvaluationReport {
        EvaluationReport {
            match_conditions: vec![ClauseOutcome {
                name: Some("is-deployment".to_string()),
                result: Some(json!(true)),
                cost: 5,
                ..ClauseOutcome::default()
            }],
            validation_variables: vec![VariableOutcome {
                name: "replicas".to_string(),
                value: json!(10),
                cost: 3,
                error: None,
            }],
            validations: vec![
                ClauseOutcome {
                    result: Some(json!(false)),
                    cost: 5,
                    message: Some(json!("too many replicas")),
                    ..ClauseOutcome::default()
                },
                ClauseOutcome {
                    cost: 3,
                    error: Some("no such key: spec".to_string()),
                    ..ClauseOutcome::default()
                },
            ],
            ..EvaluationReport::default()
        }
        .finish()
    }

    #[test]
    fn test_console_without_colors() {
        let mut output = String::new();
        generate(&report(), false, &mut output).unwrap();
        insta::assert_snapshot!(output.trim_end(), @r"
        Match conditions
          ✔ is-deployment [cost 5]
        Validation variables
          replicas = 10 [cost 3]
        Validations
          ✘ #1 [cost 5]: too many replicas
          ! #2 [cost 3]
              no such key: spec
        Total cost: 16
        ");
    }

    #[test]
    fn test_console_with_colors() {
        let mut output = String::new();
        generate(&report(), true, &mut output).unwrap();
        assert!(output.contains("\x1b["));
        assert!(output.contains("too many replicas"));
    }

    #[test]
    fn test_webhooks_and_annotations() {
        let report = EvaluationReport {
            audit_annotations: vec![ClauseOutcome {
                name: Some("owner".to_string()),
                cost: 4,
                message: Some(json!("team-a")),
                ..ClauseOutcome::default()
            }],
            webhook_match_conditions: vec![
                vec![ClauseOutcome {
                    name: Some("a".to_string()),
                    result: Some(json!(true)),
                    cost: 1,
                    ..ClauseOutcome::default()
                }],
                vec![],
            ],
            ..EvaluationReport::default()
        }
        .finish();

        let mut output = String::new();
        generate(&report, false, &mut output).unwrap();
        insta::assert_snapshot!(output.trim_end(), @r"
        Audit annotations
          owner = team-a [cost 4]
        Webhook #1
          ✔ a [cost 1]
        Total cost: 5
        ");
    }

    #[test]
    fn test_expression_result() {
        let result = ExpressionResult {
            result: json!({"a": 1}),
            cost: 3,
        };
        let mut output = String::new();
        generate_expression(&result, false, &mut output).unwrap();
        assert_eq!(output, "{\"a\":1}\nTotal cost: 3\n");
    }
}
