//! Healthwatch audit framework
//!
//! This crate runs browser health audits against a live application and
//! escalates failures through a mail transport, at most once per run and
//! only on the final configured retry attempt.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Audit Runner (harness)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HealthAuditor                                              │
//! │    ├── run(driver, spec, retry) -> AuditResult<()>          │
//! │    ├── collects check failures into a per-run list          │
//! │    ├── captures failure/error screenshot                    │
//! │    └── escalates once, only when retry.is_final()           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuditSpec (YAML)                                           │
//! │    ├── name, description, tags, target                      │
//! │    └── checks: [CheckSpec]                                  │
//! │          ├── title_contains { needle }                      │
//! │          ├── element_visible { selector }                   │
//! │          ├── text_visible { text }                          │
//! │          └── http_status { url, expect }                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver (trait)  ──  PlaywrightDriver (Node bridge)     │
//! │  AlertTransport (trait)  ──  Mailer (HTTP relay)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod alert;
pub mod auditor;
pub mod browser;
pub mod check;
pub mod error;
pub mod page;
pub mod report;

pub use alert::{AlertPayload, AlertTransport, Mailer, MailerConfig};
pub use auditor::{HealthAuditor, RetryContext};
pub use browser::{Browser, BrowserConfig, PageDriver, PlaywrightDriver};
pub use check::{AuditSpec, CheckResult, CheckSpec};
pub use error::{AuditError, AuditResult};
