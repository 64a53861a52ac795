//! Declarative YAML audit specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::browser::PageDriver;
use crate::error::{AuditError, AuditResult};

/// A complete audit specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSpec {
    /// Unique name for this audit
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering audits
    #[serde(default)]
    pub tags: Vec<String>,

    /// URL the audit navigates to before running checks
    pub target: String,

    /// Checks to evaluate in order
    pub checks: Vec<CheckSpec>,
}

/// A single named check against application state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckSpec {
    /// Assert that the page title contains a substring
    TitleContains { name: String, needle: String },

    /// Assert that an element is visible
    ElementVisible { name: String, selector: String },

    /// Assert that a text locator is visible on the page
    TextVisible { name: String, text: String },

    /// Assert that an endpoint responds with the expected status
    HttpStatus {
        name: String,
        url: String,
        #[serde(default = "default_expect")]
        expect: u16,
    },
}

fn default_expect() -> u16 {
    200
}

/// Outcome of evaluating one check: pass, or one failure description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub failure: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failure: None,
        }
    }

    pub fn fail(name: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            failure: Some(description.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

impl CheckSpec {
    pub fn name(&self) -> &str {
        match self {
            CheckSpec::TitleContains { name, .. } => name,
            CheckSpec::ElementVisible { name, .. } => name,
            CheckSpec::TextVisible { name, .. } => name,
            CheckSpec::HttpStatus { name, .. } => name,
        }
    }

    /// Evaluate this check against the current page state.
    ///
    /// A failed assertion yields a `CheckResult` carrying a description;
    /// a driver error propagates and aborts the remaining checks.
    pub async fn evaluate(&self, driver: &dyn PageDriver) -> AuditResult<CheckResult> {
        match self {
            CheckSpec::TitleContains { name, needle } => {
                let title = driver.title().await?;
                if title.contains(needle.as_str()) {
                    Ok(CheckResult::pass(name))
                } else {
                    Ok(CheckResult::fail(
                        name,
                        format!("Page title does not contain '{}' (got '{}')", needle, title),
                    ))
                }
            }
            CheckSpec::ElementVisible { name, selector } => {
                if driver.is_visible(selector).await? {
                    Ok(CheckResult::pass(name))
                } else {
                    Ok(CheckResult::fail(name, format!("{} is not visible", name)))
                }
            }
            CheckSpec::TextVisible { name, text } => {
                if driver.is_text_visible(text).await? {
                    Ok(CheckResult::pass(name))
                } else {
                    Ok(CheckResult::fail(
                        name,
                        format!("Text '{}' is not visible", text),
                    ))
                }
            }
            CheckSpec::HttpStatus { name, url, expect } => {
                let status = driver.get_status(url).await?;
                if status == *expect {
                    Ok(CheckResult::pass(name))
                } else {
                    Ok(CheckResult::fail(
                        name,
                        format!(
                            "Endpoint {} returned status {} (expected {})",
                            url, status, expect
                        ),
                    ))
                }
            }
        }
    }
}

impl AuditSpec {
    /// Parse an audit spec from a YAML string
    pub fn from_yaml(yaml: &str) -> AuditResult<Self> {
        serde_yaml::from_str(yaml).map_err(AuditError::from)
    }

    /// Parse an audit spec from a YAML file
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all audit specs from a directory
    pub fn load_all(dir: &Path) -> AuditResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs
            .iter()
            .filter(|s| s.tags.contains(&tag.to_string()))
            .collect()
    }
}
