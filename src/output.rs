// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::diagnostics::Warning;
use crate::probe::{CommandCheck, ProbeReport};
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with per-command results
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print the results of a probe run.
    pub fn report(&self, report: &ProbeReport) {
        match self.mode {
            OutputMode::Normal => {
                for outcome in &report.outcomes {
                    let mark = if outcome.passed() { "✓" } else { "✗" };
                    println!("  {mark} {} authentication", outcome.method);
                    for check in &outcome.checks {
                        println!("      {}", describe_check(check));
                    }
                    if let Some(e) = &outcome.error {
                        println!("      error: {e}");
                    }
                }
                for warning in report.diagnostics.warnings() {
                    println!("  ! {}", warning.message);
                }
                let summary = summary_line(report);
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{summary} ({:.1}s)", elapsed);
                } else {
                    println!("{summary}");
                }
            }
            OutputMode::Quiet => {
                println!("{}", summary_line(report));
            }
            OutputMode::Json => {
                let event = JsonReport::from_report(report, self.duration());
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }
}

fn describe_check(check: &CommandCheck) -> String {
    match (&check.expected, check.passed()) {
        (_, true) => format!("ok   {}", check.command),
        (Some(expected), false) => format!(
            "FAIL {}: expected {:?}, got {:?}",
            check.command,
            expected,
            check.actual()
        ),
        (None, false) => format!(
            "FAIL {}: exit status {}",
            check.command,
            check
                .output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
    }
}

fn summary_line(report: &ProbeReport) -> String {
    let total = report.outcomes.len();
    if report.passed() {
        format!("{}: {} probe(s) passed", report.target, total)
    } else {
        format!(
            "{}: {} of {} probe(s) failed",
            report.target,
            report.failed_count(),
            total
        )
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    event: &'static str,
    target: &'a str,
    passed: bool,
    probes: Vec<JsonProbe<'a>>,
    warnings: &'a [Warning],
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonProbe<'a> {
    method: &'a str,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    commands: Vec<JsonCheck<'a>>,
}

#[derive(Serialize)]
struct JsonCheck<'a> {
    command: &'a str,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'a str>,
    output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<u32>,
}

impl<'a> JsonReport<'a> {
    fn from_report(report: &'a ProbeReport, duration_secs: Option<f64>) -> Self {
        let probes = report
            .outcomes
            .iter()
            .map(|outcome| JsonProbe {
                method: outcome.method,
                passed: outcome.passed(),
                error: outcome.error.as_ref().map(|e| e.to_string()),
                commands: outcome
                    .checks
                    .iter()
                    .map(|check| JsonCheck {
                        command: &check.command,
                        passed: check.passed(),
                        expected: check.expected.as_deref(),
                        output: &check.output.output,
                        exit_code: check.output.exit_code,
                    })
                    .collect(),
            })
            .collect();

        Self {
            event: "report",
            target: &report.target,
            passed: report.passed(),
            probes,
            warnings: report.diagnostics.warnings(),
            duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::probe::ProbeOutcome;
    use crate::ssh::{self, CommandOutput};

    fn report(error: Option<ssh::Error>, output: &str) -> ProbeReport {
        ProbeReport {
            target: "admin@localhost:2222".to_string(),
            outcomes: vec![ProbeOutcome {
                method: "password",
                checks: vec![CommandCheck {
                    command: "echo Hello, World!".to_string(),
                    expected: Some("Hello, World!".to_string()),
                    output: CommandOutput {
                        output: output.to_string(),
                        exit_code: Some(0),
                    },
                }],
                error,
            }],
            diagnostics: Diagnostics::default(),
        }
    }

    #[test]
    fn summary_reports_pass() {
        let line = summary_line(&report(None, "Hello, World!\n"));
        assert_eq!(line, "admin@localhost:2222: 1 probe(s) passed");
    }

    #[test]
    fn summary_reports_failures() {
        let line = summary_line(&report(Some(ssh::Error::NotAuthenticated), ""));
        assert_eq!(line, "admin@localhost:2222: 1 of 1 probe(s) failed");
    }

    #[test]
    fn mismatch_description_shows_both_sides() {
        let report = report(None, "Hi\n");
        let text = describe_check(&report.outcomes[0].checks[0]);
        assert!(text.starts_with("FAIL"));
        assert!(text.contains("\"Hello, World!\""));
        assert!(text.contains("\"Hi\""));
    }

    #[test]
    fn json_report_carries_outputs_and_errors() {
        let report = report(
            Some(ssh::Error::AuthenticationFailed { method: "password" }),
            "Hello, World!\n",
        );
        let json = serde_json::to_value(JsonReport::from_report(&report, None)).unwrap();

        assert_eq!(json["event"], "report");
        assert_eq!(json["passed"], false);
        assert_eq!(json["probes"][0]["method"], "password");
        assert_eq!(json["probes"][0]["commands"][0]["passed"], true);
        assert_eq!(json["probes"][0]["commands"][0]["output"], "Hello, World!\n");
        assert!(
            json["probes"][0]["error"]
                .as_str()
                .unwrap()
                .contains("authentication failed")
        );
        assert!(json.get("duration_secs").is_none());
    }
}
