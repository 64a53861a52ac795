//! Suite summary and HTML report mail

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alert::{AlertPayload, AlertTransport};
use crate::error::AuditResult;

/// Result of one audit run, as recorded in the results file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a whole audit suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub browser: String,
    pub timestamp: DateTime<Utc>,
    pub records: Vec<AuditRecord>,
}

impl SuiteSummary {
    pub fn from_records(records: Vec<AuditRecord>, browser: &str, duration_ms: u64) -> Self {
        let total = records.len();
        let passed = records.iter().filter(|r| r.success).count();
        Self {
            total,
            passed,
            failed: total - passed,
            duration_ms,
            browser: browser.to_string(),
            timestamp: Utc::now(),
            records,
        }
    }

    pub fn status_line(&self) -> &'static str {
        if self.failed == 0 {
            "ALL PASSED"
        } else {
            "FAILURES DETECTED"
        }
    }
}

/// Render the summary as a self-contained HTML report
pub fn render_html(summary: &SuiteSummary) -> String {
    let mut rows = String::new();
    for record in &summary.records {
        let status = if record.success { "PASS" } else { "FAIL" };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{} ms</td><td>{}</td></tr>\n",
            record.name,
            status,
            record.duration_ms,
            record.error.as_deref().unwrap_or("-"),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 20px; }}
    h1 {{ color: #333; }}
    .stats span {{ margin-right: 20px; font-weight: bold; }}
    table {{ border-collapse: collapse; margin-top: 20px; }}
    td, th {{ border: 1px solid #ccc; padding: 8px 12px; text-align: left; }}
    .footer {{ margin-top: 30px; color: #666; font-size: 12px; }}
  </style>
</head>
<body>
  <h1>Health Audit Report: {status}</h1>
  <div class="stats">
    <span>Total: {total}</span>
    <span>Passed: {passed}</span>
    <span>Failed: {failed}</span>
    <span>Browser: {browser}</span>
    <span>Duration: {duration} ms</span>
  </div>
  <table>
    <tr><th>Audit</th><th>Status</th><th>Duration</th><th>Error</th></tr>
    {rows}
  </table>
  <div class="footer">Report generated: {timestamp}</div>
</body>
</html>
"#,
        status = summary.status_line(),
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        browser = summary.browser,
        duration = summary.duration_ms,
        rows = rows,
        timestamp = summary.timestamp.to_rfc3339(),
    )
}

/// Write the HTML report next to the JSON results
pub fn write_html(summary: &SuiteSummary, output_dir: &Path) -> AuditResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("audit-report.html");
    std::fs::write(&path, render_html(summary))?;
    info!("Report written to: {}", path.display());
    Ok(path)
}

/// Mail the report through the alert seam
pub async fn send_report(
    summary: &SuiteSummary,
    transport: &impl AlertTransport,
) -> AuditResult<()> {
    let payload = AlertPayload {
        subject: format!(
            "Health Audit Report: {}/{} passed",
            summary.passed, summary.total
        ),
        message: render_html(summary),
        screenshot: None,
    };
    transport.send(&payload).await
}
