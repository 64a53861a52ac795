//! Retry-aware health audits
//!
//! `HealthAuditor` runs the ordered check list of an [`AuditSpec`],
//! collects failure descriptions, captures a screenshot on any failure,
//! and escalates through the alert transport only on the final configured
//! retry attempt. The external harness owns retries; the auditor only
//! reads the retry context.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::alert::{AlertPayload, AlertTransport};
use crate::browser::PageDriver;
use crate::check::AuditSpec;
use crate::error::{AuditError, AuditResult};

/// Retry state supplied by the calling harness, read-only here.
///
/// `attempt` is the zero-based retry index; `max_retries` the configured
/// retry count. Equality marks the final attempt, matching Playwright's
/// `testInfo.retry === project.retries` reporting contract.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext {
    pub attempt: u32,
    pub max_retries: u32,
}

impl RetryContext {
    pub fn new(attempt: u32, max_retries: u32) -> Self {
        Self {
            attempt,
            max_retries,
        }
    }

    /// Whether this is the last allowed attempt
    pub fn is_final(&self) -> bool {
        self.attempt == self.max_retries
    }
}

/// Outcome kind of a failed run, selects screenshot tag and alert subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutcomeKind {
    /// One or more checks collected a failure description
    Failure,
    /// A check raised an error outside its assertion logic
    Error,
}

impl OutcomeKind {
    fn tag(&self) -> &'static str {
        match self {
            OutcomeKind::Failure => "failure",
            OutcomeKind::Error => "error",
        }
    }
}

/// Per-run state: failure list plus the at-most-once alert guard.
/// Created at the start of a run, discarded at its end.
#[derive(Debug, Default)]
struct AuditRun {
    failures: Vec<String>,
    error_text: Option<String>,
    alert_sent: bool,
}

/// Runs health audits and decides exactly once per run whether to escalate
pub struct HealthAuditor<T: AlertTransport> {
    transport: T,
    screenshot_dir: PathBuf,
}

impl<T: AlertTransport> HealthAuditor<T> {
    pub fn new(transport: T, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// Access the underlying transport (call-count assertions in tests)
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one audit: navigate, evaluate every check in order, escalate.
    ///
    /// Collected failures become a single [`AuditError::ChecksFailed`];
    /// an unexpected error aborts the remaining checks and propagates
    /// unchanged. Either way the run ends in an error so the harness
    /// marks it failed. An all-pass run returns silently.
    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        spec: &AuditSpec,
        retry: RetryContext,
    ) -> AuditResult<()> {
        info!(audit = %spec.name, attempt = retry.attempt, "Running health audit");

        let mut run = AuditRun::default();

        match self.execute_checks(driver, spec, &mut run).await {
            Ok(()) if run.failures.is_empty() => {
                info!(audit = %spec.name, "All checks passed");
                Ok(())
            }
            Ok(()) => {
                let count = run.failures.len();
                self.escalate(driver, spec, &retry, &mut run, OutcomeKind::Failure)
                    .await?;
                Err(AuditError::ChecksFailed { count })
            }
            Err(err) => {
                run.error_text = Some(err.to_string());
                self.escalate(driver, spec, &retry, &mut run, OutcomeKind::Error)
                    .await?;
                Err(err)
            }
        }
    }

    /// Evaluate checks strictly in order; fail-fast on unexpected errors
    async fn execute_checks(
        &self,
        driver: &dyn PageDriver,
        spec: &AuditSpec,
        run: &mut AuditRun,
    ) -> AuditResult<()> {
        driver.navigate(&spec.target).await?;

        for check in &spec.checks {
            let result = check.evaluate(driver).await?;
            match result.failure {
                Some(description) => {
                    warn!(check = %result.name, "{}", description);
                    run.failures.push(description);
                }
                None => debug!(check = %result.name, "passed"),
            }
        }

        Ok(())
    }

    /// Capture a screenshot and, on the final attempt only, send one alert.
    ///
    /// Screenshot capture always completes before the send. The send is
    /// guarded so a second invocation within the same run cannot produce
    /// a duplicate alert. Transport failures propagate.
    async fn escalate(
        &self,
        driver: &dyn PageDriver,
        spec: &AuditSpec,
        retry: &RetryContext,
        run: &mut AuditRun,
        kind: OutcomeKind,
    ) -> AuditResult<()> {
        let path = self
            .screenshot_dir
            .join(format!("{}-{}.png", spec.name, kind.tag()));
        let screenshot = match driver.capture_screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                // Best effort: a lost screenshot must not mask the audit failure
                warn!("Screenshot capture failed: {}", e);
                None
            }
        };

        if !retry.is_final() {
            debug!(
                attempt = retry.attempt,
                max_retries = retry.max_retries,
                "Non-final attempt, deferring alert"
            );
            return Ok(());
        }

        if run.alert_sent {
            debug!("Alert already sent for this run");
            return Ok(());
        }
        run.alert_sent = true;

        let payload = self.build_payload(retry, run, kind, screenshot);
        self.transport.send(&payload).await
    }

    fn build_payload(
        &self,
        retry: &RetryContext,
        run: &AuditRun,
        kind: OutcomeKind,
        screenshot: Option<PathBuf>,
    ) -> AlertPayload {
        let attempts = retry.attempt + 1;
        match kind {
            OutcomeKind::Failure => AlertPayload {
                subject: "CRITICAL: Application Health Check Failed".to_string(),
                message: format!(
                    "Health check failed after {} attempt(s) at {}\n\nIssues:\n{}",
                    attempts,
                    Utc::now().to_rfc3339(),
                    run.failures.join("\n"),
                ),
                screenshot,
            },
            OutcomeKind::Error => AlertPayload {
                subject: "CRITICAL: Application Health Check Error".to_string(),
                message: format!(
                    "Unexpected error during health check after {} attempt(s):\n{}",
                    attempts,
                    run.error_text.as_deref().unwrap_or("unknown error"),
                ),
                screenshot,
            },
        }
    }
}
