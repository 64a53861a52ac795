//! Playwright browser automation
//!
//! Drives Playwright through a generated Node.js bridge script that reads
//! JSON commands from stdin and answers one JSON line per command. The
//! bridge keeps a single page alive for the whole audit run, so checks see
//! the page state left behind by earlier checks.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AuditError, AuditResult};

/// Boundary to the browser automation collaborator.
///
/// `HealthAuditor` and the page objects only ever talk to this trait;
/// tests substitute a scripted stub.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> AuditResult<()>;
    async fn title(&self) -> AuditResult<String>;
    async fn is_visible(&self, selector: &str) -> AuditResult<bool>;
    async fn is_text_visible(&self, text: &str) -> AuditResult<bool>;
    async fn fill(&self, selector: &str, value: &str) -> AuditResult<()>;
    async fn click(&self, selector: &str) -> AuditResult<()>;
    async fn text_content(&self, selector: &str) -> AuditResult<Option<String>>;
    async fn get_status(&self, url: &str) -> AuditResult<u16>;
    async fn capture_screenshot(&self, path: &Path) -> AuditResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(AuditError::Driver(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for the Playwright driver
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    ok: bool,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// Playwright-backed page driver
pub struct PlaywrightDriver {
    child: Child,
    bridge: Mutex<BridgeIo>,
    http: reqwest::Client,
    // Keeps the generated bridge script alive for the child's lifetime
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Launch a browser and wait for the bridge to come up
    pub async fn launch(config: BrowserConfig) -> AuditResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, Self::bridge_script(&config))?;

        debug!("Spawning Playwright bridge: {}", script_path.display());

        let mut child = Command::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AuditError::Driver("failed to open bridge stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AuditError::Driver("failed to open bridge stdout".to_string()))?;

        let mut lines = BufReader::new(stdout).lines();

        // The bridge prints one ready line once the page is open
        let ready = lines
            .next_line()
            .await?
            .ok_or_else(|| AuditError::Driver("bridge exited before ready".to_string()))?;
        let ready: BridgeReply = serde_json::from_str(&ready)?;
        if !ready.ok {
            return Err(AuditError::Driver(
                ready.error.unwrap_or_else(|| "bridge failed to start".to_string()),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            child,
            bridge: Mutex::new(BridgeIo { stdin, lines }),
            http,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> AuditResult<()> {
        let output = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(AuditError::PlaywrightNotFound),
        }
    }

    /// Build the Node.js bridge script for this configuration
    fn bridge_script(config: &BrowserConfig) -> String {
        format!(
            r#"
const readline = require('readline');
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const engines = {{ chromium, firefox, webkit }};
  const browser = await engines['{browser}'].launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const rl = readline.createInterface({{ input: process.stdin, terminal: false }});

  console.log(JSON.stringify({{ ok: true, value: 'ready' }}));

  for await (const line of rl) {{
    let reply;
    try {{
      const cmd = JSON.parse(line);
      let value = null;
      switch (cmd.op) {{
        case 'navigate':
          await page.goto(cmd.url);
          break;
        case 'title':
          value = await page.title();
          break;
        case 'is_visible':
          value = await page.isVisible(cmd.selector);
          break;
        case 'is_text_visible':
          value = await page.getByText(cmd.text).first().isVisible();
          break;
        case 'fill':
          await page.fill(cmd.selector, cmd.value);
          break;
        case 'click':
          await page.click(cmd.selector);
          break;
        case 'text_content':
          value = await page.textContent(cmd.selector);
          break;
        case 'screenshot':
          await page.screenshot({{ path: cmd.path }});
          break;
        case 'quit':
          await browser.close();
          process.exit(0);
        default:
          throw new Error('unknown op: ' + cmd.op);
      }}
      reply = {{ ok: true, value }};
    }} catch (error) {{
      reply = {{ ok: false, error: error.message }};
    }}
    console.log(JSON.stringify(reply));
  }}
}})();
"#,
            browser = config.browser.as_str(),
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
        )
    }

    /// Send one command to the bridge and wait for its reply
    async fn call(&self, cmd: Value) -> AuditResult<Value> {
        let mut io = self.bridge.lock().await;

        let line = serde_json::to_string(&cmd)?;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let reply = io
            .lines
            .next_line()
            .await?
            .ok_or_else(|| AuditError::Driver("bridge closed unexpectedly".to_string()))?;
        let reply: BridgeReply = serde_json::from_str(&reply)?;

        if reply.ok {
            Ok(reply.value.unwrap_or(Value::Null))
        } else {
            Err(AuditError::Driver(
                reply.error.unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }

    /// Close the browser and reap the bridge process
    pub async fn close(mut self) -> AuditResult<()> {
        let _ = self.call(json!({ "op": "quit" })).await;
        let _ = self.child.wait().await;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> AuditResult<()> {
        debug!("navigate: {}", url);
        self.call(json!({ "op": "navigate", "url": url })).await?;
        Ok(())
    }

    async fn title(&self) -> AuditResult<String> {
        let value = self.call(json!({ "op": "title" })).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self, selector: &str) -> AuditResult<bool> {
        let value = self
            .call(json!({ "op": "is_visible", "selector": selector }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_text_visible(&self, text: &str) -> AuditResult<bool> {
        let value = self
            .call(json!({ "op": "is_text_visible", "text": text }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn fill(&self, selector: &str, value: &str) -> AuditResult<()> {
        self.call(json!({ "op": "fill", "selector": selector, "value": value }))
            .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> AuditResult<()> {
        self.call(json!({ "op": "click", "selector": selector }))
            .await?;
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> AuditResult<Option<String>> {
        let value = self
            .call(json!({ "op": "text_content", "selector": selector }))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn get_status(&self, url: &str) -> AuditResult<u16> {
        let resp = self.http.get(url).send().await?;
        Ok(resp.status().as_u16())
    }

    async fn capture_screenshot(&self, path: &Path) -> AuditResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.call(json!({ "op": "screenshot", "path": path.to_string_lossy() }))
            .await?;
        Ok(())
    }
}
