use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::checker::ComplianceChecker;
use super::report::{CheckReport, ValidatorKind};
use crate::config::ComplianceSettings;
use crate::core::FacturxError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The veraPDF command-line validator.
///
/// [`discover`](Self::discover) runs once; the found path is kept for
/// the lifetime of the checker.
#[derive(Debug, Clone)]
pub struct VeraPdfChecker {
    path: Option<PathBuf>,
    flavour: String,
    timeout: Duration,
}

impl VeraPdfChecker {
    /// Use the explicit path from `settings`, or the first candidate that
    /// answers `--version` within the discovery timeout.
    pub fn discover(settings: &ComplianceSettings) -> Self {
        let candidates: Vec<&Path> = match &settings.verapdf_path {
            Some(p) => vec![p.as_path()],
            None => settings.verapdf_candidates.iter().map(PathBuf::as_path).collect(),
        };
        let path = candidates
            .into_iter()
            .find(|c| answers_version(c, settings.discovery_timeout()))
            .map(Path::to_path_buf);
        match &path {
            Some(p) => info!(path = %p.display(), "found veraPDF"),
            None => warn!("veraPDF not found, PDF/A validation will be limited"),
        }
        Self {
            path,
            flavour: settings.flavour.clone(),
            timeout: settings.validation_timeout(),
        }
    }

    /// Trust `path` without probing.
    pub fn at(path: impl Into<PathBuf>, flavour: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: Some(path.into()),
            flavour: flavour.into(),
            timeout,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl ComplianceChecker for VeraPdfChecker {
    fn is_available(&self) -> bool {
        self.path.is_some()
    }

    fn location(&self) -> Option<String> {
        self.path.as_ref().map(|p| p.display().to_string())
    }

    fn check(&self, pdf: &[u8]) -> Result<CheckReport, FacturxError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| FacturxError::ExternalTool("veraPDF not available".into()))?;

        // Removed on drop, on every exit path.
        let mut tmp = tempfile::Builder::new()
            .prefix("facturx-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| FacturxError::ExternalTool(format!("cannot create temp file: {e}")))?;
        tmp.write_all(pdf)
            .and_then(|()| tmp.flush())
            .map_err(|e| FacturxError::ExternalTool(format!("cannot write temp file: {e}")))?;

        let mut cmd = Command::new(path);
        cmd.arg("--format")
            .arg("json")
            .arg("--flavour")
            .arg(&self.flavour)
            .arg(tmp.path());
        let output = run_with_timeout(&mut cmd, self.timeout)?;

        // Only a clean exit is trusted; the caller falls back on anything else.
        if !output.status.success() {
            return Err(FacturxError::ExternalTool(format!(
                "veraPDF exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = parse_verapdf_output(&stdout)?;
        debug!(valid = report.is_valid, errors = report.errors.len(), "veraPDF finished");
        Ok(report)
    }
}

fn answers_version(candidate: &Path, timeout: Duration) -> bool {
    let mut cmd = Command::new(candidate);
    cmd.arg("--version");
    match run_with_timeout(&mut cmd, timeout) {
        Ok(out) => out.status.success(),
        Err(e) => {
            debug!(candidate = %candidate.display(), error = %e, "veraPDF version check failed");
            false
        }
    }
}

/// Run `cmd`, killing it when `timeout` elapses.
///
/// The deadline also covers collecting output: a background process that
/// inherited the pipes cannot hold the caller past `timeout`.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, FacturxError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| FacturxError::ExternalTool(format!("cannot start veraPDF: {e}")))?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FacturxError::ExternalTool(format!(
                    "veraPDF timed out after {}s",
                    timeout.as_secs()
                )));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(FacturxError::ExternalTool(format!("waiting for veraPDF: {e}")));
            }
        }
    };

    Ok(Output {
        status,
        stdout: collect(stdout, deadline, timeout)?,
        stderr: collect(stderr, deadline, timeout)?,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a drain thread until `deadline`. A reader still blocked after
/// that is left detached.
fn collect(
    pipe: Option<Receiver<Vec<u8>>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>, FacturxError> {
    let Some(rx) = pipe else {
        return Ok(Vec::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        Err(RecvTimeoutError::Timeout) => Err(FacturxError::ExternalTool(format!(
            "veraPDF output still open after {}s",
            timeout.as_secs()
        ))),
    }
}

// veraPDF JSON. Older releases put `jobs` at the top level, newer ones
// under `report`, and `validationResult` may be a single object or a list.

#[derive(Debug, Deserialize)]
struct VeraOutput {
    #[serde(default)]
    jobs: Vec<VeraJob>,
    #[serde(default)]
    report: Option<VeraEnvelope>,
}

#[derive(Debug, Deserialize)]
struct VeraEnvelope {
    #[serde(default)]
    jobs: Vec<VeraJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeraJob {
    #[serde(default)]
    validation_result: Option<OneOrMany<VeraValidationResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeraValidationResult {
    #[serde(default)]
    is_compliant: bool,
    #[serde(default, alias = "profileName")]
    profile: Option<String>,
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    test_assertions: Vec<TestAssertion>,
    #[serde(default)]
    details: Option<VeraDetails>,
}

#[derive(Debug, Deserialize)]
struct TestAssertion {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeraDetails {
    #[serde(default)]
    rule_summaries: Vec<RuleSummary>,
}

#[derive(Debug, Deserialize)]
struct RuleSummary {
    #[serde(default)]
    status: String,
    #[serde(default)]
    clause: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Turn veraPDF `--format json` output into a report.
pub fn parse_verapdf_output(json: &str) -> Result<CheckReport, FacturxError> {
    let output: VeraOutput = serde_json::from_str(json).map_err(|e| {
        FacturxError::ExternalTool(format!("Failed to parse validation result: {e}"))
    })?;
    let jobs = match output.report {
        Some(envelope) if output.jobs.is_empty() => envelope.jobs,
        _ => output.jobs,
    };

    let mut report = CheckReport::new(ValidatorKind::VeraPdf);
    let result = jobs
        .into_iter()
        .next()
        .and_then(|job| job.validation_result)
        .and_then(|r| match r {
            OneOrMany::One(r) => Some(r),
            OneOrMany::Many(list) => list.into_iter().next(),
        });
    let Some(result) = result else {
        report.errors.push("No validation jobs found".into());
        return Ok(report.finish());
    };

    for assertion in result.test_assertions {
        let message = assertion.message.unwrap_or_else(|| "Unknown error".into());
        match assertion.status.to_ascii_uppercase().as_str() {
            "FAILED" => report.errors.push(message),
            "WARNING" => report.warnings.push(message),
            _ => {}
        }
    }
    if let Some(details) = result.details {
        for rule in details.rule_summaries {
            if rule.status.eq_ignore_ascii_case("failed") {
                let text = rule.description.unwrap_or_else(|| "Unknown error".into());
                report.errors.push(match rule.clause {
                    Some(clause) => format!("{clause}: {text}"),
                    None => text,
                });
            }
        }
    }

    report.profile = Some(result.profile.unwrap_or_else(|| "PDF/A-3B".into()));
    report.statement = result.statement;
    report.is_valid = result.is_compliant;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_layout() {
        let json = r#"{"jobs":[{"validationResult":{
            "isCompliant": false,
            "profile": "PDF/A-3B validation profile",
            "statement": "PDF file is not compliant",
            "testAssertions": [
                {"status": "FAILED", "message": "XMP missing"},
                {"status": "WARNING", "message": "font subset"},
                {"status": "PASSED", "message": "ok"}
            ]}}]}"#;
        let r = parse_verapdf_output(json).unwrap();
        assert!(!r.is_valid);
        assert_eq!(r.validator, ValidatorKind::VeraPdf);
        assert_eq!(r.errors, vec!["XMP missing"]);
        assert_eq!(r.warnings, vec!["font subset"]);
        assert_eq!(r.profile.as_deref(), Some("PDF/A-3B validation profile"));
        assert_eq!(r.statement.as_deref(), Some("PDF file is not compliant"));
    }

    #[test]
    fn parses_report_envelope_with_rule_summaries() {
        let json = r#"{"report":{"jobs":[{"validationResult":[{
            "isCompliant": true,
            "profileName": "PDF/A-3B",
            "details": {"ruleSummaries": []}
        }]}]}}"#;
        let r = parse_verapdf_output(json).unwrap();
        assert!(r.is_valid);
        assert_eq!(r.profile.as_deref(), Some("PDF/A-3B"));
    }

    #[test]
    fn failed_rules_become_errors() {
        let json = r#"{"jobs":[{"validationResult":{"isCompliant":false,
            "details":{"ruleSummaries":[
                {"status":"failed","clause":"6.6.2.1","description":"Metadata stream missing"}
            ]}}}]}"#;
        let r = parse_verapdf_output(json).unwrap();
        assert_eq!(r.errors, vec!["6.6.2.1: Metadata stream missing"]);
    }

    #[test]
    fn empty_jobs_is_invalid_report() {
        let r = parse_verapdf_output(r#"{"jobs":[]}"#).unwrap();
        assert!(!r.is_valid);
        assert_eq!(r.errors, vec!["No validation jobs found"]);
    }

    #[test]
    fn garbage_is_external_tool_error() {
        let err = parse_verapdf_output("veraPDF 1.26 crashed").unwrap_err();
        assert!(matches!(err, FacturxError::ExternalTool(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let settings = ComplianceSettings {
            verapdf_path: Some(PathBuf::from("/nonexistent/verapdf-for-tests")),
            discovery_timeout_secs: 1,
            ..ComplianceSettings::default()
        };
        let checker = VeraPdfChecker::discover(&settings);
        assert!(!checker.is_available());
        assert!(checker.check(b"%PDF-1.7").is_err());
    }

    #[test]
    fn unstartable_tool_errors_instead_of_panicking() {
        let checker = VeraPdfChecker::at("/nonexistent/verapdf-for-tests", "3b", Duration::from_secs(1));
        assert!(checker.is_available());
        let err = checker.check(b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, FacturxError::ExternalTool(_)));
    }
}
