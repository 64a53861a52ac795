//! Page objects: reusable UI element definitions bound to a page driver

use crate::browser::PageDriver;
use crate::error::AuditResult;

/// Login page object: selectors plus the actions that use them
pub struct LoginPage<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    url: String,
}

const EMAIL_INPUT: &str = "input[placeholder='Enter email']";
const PASSWORD_INPUT: &str = "input[placeholder='Enter password']";
const LOGIN_BUTTON: &str = "button:has-text('Login')";
const ERROR_ALERT: &str = "[role='alert']";

impl<'a, D: PageDriver + ?Sized> LoginPage<'a, D> {
    pub fn new(driver: &'a D, base_url: &str) -> Self {
        Self {
            driver,
            url: format!("{}/login", base_url.trim_end_matches('/')),
        }
    }

    pub async fn open(&self) -> AuditResult<()> {
        self.driver.navigate(&self.url).await
    }

    pub async fn login(&self, email: &str, password: &str) -> AuditResult<()> {
        self.driver.fill(EMAIL_INPUT, email).await?;
        self.driver.fill(PASSWORD_INPUT, password).await?;
        self.driver.click(LOGIN_BUTTON).await
    }

    pub async fn is_login_button_visible(&self) -> AuditResult<bool> {
        self.driver.is_visible(LOGIN_BUTTON).await
    }

    pub async fn is_error_visible(&self) -> AuditResult<bool> {
        self.driver.is_visible(ERROR_ALERT).await
    }

    pub async fn error_message(&self) -> AuditResult<Option<String>> {
        self.driver.text_content(ERROR_ALERT).await
    }
}
