//! Escalation behavior of the health auditor: screenshots on any failure,
//! exactly one alert on the final retry attempt, none before it, and a
//! terminal error either way.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use healthwatch_audit::{
    AlertPayload, AlertTransport, AuditError, AuditResult, AuditSpec, CheckSpec, HealthAuditor,
    PageDriver, RetryContext,
};

/// Scripted page driver: reports configured selectors as hidden, canned
/// HTTP statuses, and optionally raises a driver error for one selector.
#[derive(Default)]
struct StubDriver {
    title: String,
    hidden: HashSet<String>,
    hidden_text: HashSet<String>,
    statuses: HashMap<String, u16>,
    explode_on: Option<String>,
    screenshots: Mutex<Vec<PathBuf>>,
}

impl StubDriver {
    fn screenshot_count(&self) -> usize {
        self.screenshots.lock().unwrap().len()
    }
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn navigate(&self, _url: &str) -> AuditResult<()> {
        Ok(())
    }

    async fn title(&self) -> AuditResult<String> {
        Ok(self.title.clone())
    }

    async fn is_visible(&self, selector: &str) -> AuditResult<bool> {
        if self.explode_on.as_deref() == Some(selector) {
            return Err(AuditError::Driver("browser context crashed".to_string()));
        }
        Ok(!self.hidden.contains(selector))
    }

    async fn is_text_visible(&self, text: &str) -> AuditResult<bool> {
        Ok(!self.hidden_text.contains(text))
    }

    async fn fill(&self, _selector: &str, _value: &str) -> AuditResult<()> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> AuditResult<()> {
        Ok(())
    }

    async fn text_content(&self, _selector: &str) -> AuditResult<Option<String>> {
        Ok(None)
    }

    async fn get_status(&self, url: &str) -> AuditResult<u16> {
        Ok(*self.statuses.get(url).unwrap_or(&200))
    }

    async fn capture_screenshot(&self, path: &Path) -> AuditResult<()> {
        self.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Records every payload; tests assert the call count, not just presence.
#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<AlertPayload>>,
}

impl RecordingTransport {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_payload(&self) -> AlertPayload {
        self.calls.lock().unwrap().last().cloned().expect("no alert sent")
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn send(&self, payload: &AlertPayload) -> AuditResult<()> {
        self.calls.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Transport whose send always fails, for propagation tests
struct FailingTransport;

#[async_trait]
impl AlertTransport for FailingTransport {
    async fn send(&self, _payload: &AlertPayload) -> AuditResult<()> {
        Err(AuditError::Transport("relay returned status 503".to_string()))
    }
}

fn visibility_spec(checks: &[(&str, &str)]) -> AuditSpec {
    AuditSpec {
        name: "scenario".to_string(),
        description: String::new(),
        tags: vec![],
        target: "https://your-app.com/".to_string(),
        checks: checks
            .iter()
            .map(|(name, selector)| CheckSpec::ElementVisible {
                name: name.to_string(),
                selector: selector.to_string(),
            })
            .collect(),
    }
}

fn auditor(transport: RecordingTransport) -> HealthAuditor<RecordingTransport> {
    HealthAuditor::new(transport, "target/test-screenshots")
}

// Scenario A: one failing check, no retries configured -> alert fires
// immediately with the failure description, run raises.
#[tokio::test]
async fn single_failure_with_no_retries_alerts_once() {
    let mut driver = StubDriver::default();
    driver.hidden.insert("#login".to_string());
    let spec = visibility_spec(&[("Login button", "#login")]);
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 0)).await;

    assert!(matches!(result, Err(AuditError::ChecksFailed { count: 1 })));
    assert_eq!(auditor.transport().call_count(), 1);

    let payload = auditor.transport().last_payload();
    assert!(payload.subject.contains("Failed"));
    assert!(payload.message.contains("Login button is not visible"));
    assert!(payload.screenshot.is_some());
}

// Scenario B: failures on a non-final attempt -> screenshot but no alert,
// run still raises with the failure count.
#[tokio::test]
async fn failures_on_non_final_attempt_do_not_alert() {
    let mut driver = StubDriver::default();
    driver.hidden.insert("#a".to_string());
    driver.hidden.insert("#b".to_string());
    let spec = visibility_spec(&[("A", "#a"), ("B", "#b")]);
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 2)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuditError::ChecksFailed { count: 2 }));
    assert!(err.to_string().contains("2 issue(s)"));
    assert_eq!(auditor.transport().call_count(), 0);
    assert_eq!(driver.screenshot_count(), 1);
}

// Scenario C: same failures on the final attempt -> exactly one alert
// enumerating every collected description.
#[tokio::test]
async fn failures_on_final_attempt_alert_with_every_description() {
    let mut driver = StubDriver::default();
    driver.hidden.insert("#a".to_string());
    driver.hidden.insert("#b".to_string());
    let spec = visibility_spec(&[("A", "#a"), ("B", "#b")]);
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(2, 2)).await;

    assert!(matches!(result, Err(AuditError::ChecksFailed { count: 2 })));
    assert_eq!(auditor.transport().call_count(), 1);

    let payload = auditor.transport().last_payload();
    assert!(payload.message.contains("A is not visible"));
    assert!(payload.message.contains("B is not visible"));
}

// Scenario D: a check raises a driver error -> remaining checks are
// skipped, the alert carries the distinct error subject and the original
// message, and the run re-raises the original error.
#[tokio::test]
async fn unexpected_error_aborts_and_alerts_with_error_subject() {
    let mut driver = StubDriver::default();
    driver.explode_on = Some("#flaky".to_string());
    // The later check would fail, but must never run
    driver.hidden.insert("#after".to_string());
    let spec = visibility_spec(&[("Flaky widget", "#flaky"), ("After", "#after")]);
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 0)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuditError::Driver(_)));
    assert!(err.to_string().contains("browser context crashed"));

    assert_eq!(auditor.transport().call_count(), 1);
    let payload = auditor.transport().last_payload();
    assert!(payload.subject.contains("Error"));
    assert!(payload.message.contains("browser context crashed"));
    // The aborted check contributed no collected failure
    assert!(!payload.message.contains("After is not visible"));
}

// Scenario D on a non-final attempt: error still raises, no alert.
#[tokio::test]
async fn unexpected_error_on_non_final_attempt_does_not_alert() {
    let mut driver = StubDriver::default();
    driver.explode_on = Some("#flaky".to_string());
    let spec = visibility_spec(&[("Flaky widget", "#flaky")]);
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(1, 2)).await;

    assert!(matches!(result, Err(AuditError::Driver(_))));
    assert_eq!(auditor.transport().call_count(), 0);
    assert_eq!(driver.screenshot_count(), 1);
}

// Scenario E: all checks pass -> no alert, no screenshot, Ok.
#[tokio::test]
async fn all_passing_run_is_silent() {
    let driver = StubDriver {
        title: "Your App Title".to_string(),
        ..StubDriver::default()
    };
    let spec = AuditSpec {
        name: "scenario".to_string(),
        description: String::new(),
        tags: vec![],
        target: "https://your-app.com/".to_string(),
        checks: vec![
            CheckSpec::TitleContains {
                name: "page-title".to_string(),
                needle: "Your App".to_string(),
            },
            CheckSpec::ElementVisible {
                name: "Login button".to_string(),
                selector: "#login".to_string(),
            },
            CheckSpec::HttpStatus {
                name: "api-health".to_string(),
                url: "https://your-api.com/health".to_string(),
                expect: 200,
            },
            CheckSpec::TextVisible {
                name: "db-status".to_string(),
                text: "Database: Connected".to_string(),
            },
        ],
    };
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 2)).await;

    assert!(result.is_ok());
    assert_eq!(auditor.transport().call_count(), 0);
    assert_eq!(driver.screenshot_count(), 0);
}

// Failed endpoint checks land in the failure list with their status.
#[tokio::test]
async fn endpoint_status_mismatch_is_a_collected_failure() {
    let mut driver = StubDriver::default();
    driver
        .statuses
        .insert("https://your-api.com/health".to_string(), 503);
    let spec = AuditSpec {
        name: "scenario".to_string(),
        description: String::new(),
        tags: vec![],
        target: "https://your-app.com/".to_string(),
        checks: vec![CheckSpec::HttpStatus {
            name: "api-health".to_string(),
            url: "https://your-api.com/health".to_string(),
            expect: 200,
        }],
    };
    let auditor = auditor(RecordingTransport::default());

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 0)).await;

    assert!(matches!(result, Err(AuditError::ChecksFailed { count: 1 })));
    let payload = auditor.transport().last_payload();
    assert!(payload.message.contains("returned status 503"));
}

// A failed alert send propagates instead of the synthetic check error:
// a lost alert must never be silent.
#[tokio::test]
async fn transport_failure_propagates() {
    let mut driver = StubDriver::default();
    driver.hidden.insert("#login".to_string());
    let spec = visibility_spec(&[("Login button", "#login")]);
    let auditor = HealthAuditor::new(FailingTransport, "target/test-screenshots");

    let result = auditor.run(&driver, &spec, RetryContext::new(0, 0)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuditError::Transport(_)));
    assert!(err.to_string().contains("503"));
}
