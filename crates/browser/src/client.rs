//! W3C WebDriver client implementing the [`AutomationSession`] seam.
//!
//! [`WebDriverClient`] holds the endpoint configuration for a WebDriver
//! server (chromedriver, geckodriver, or a Selenium grid). Call
//! [`WebDriverClient::new_session`] to open a live [`WebDriverSession`];
//! each job gets its own session so browser state never leaks between jobs.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::session::{AutomationSession, BrowserError, SessionFactory};

/// W3C element identifier key in element-reference objects.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Configuration handle for a WebDriver endpoint.
pub struct WebDriverClient {
    base_url: String,
    http: reqwest::Client,
}

impl WebDriverClient {
    /// Create a client targeting a WebDriver endpoint.
    ///
    /// * `base_url` - HTTP base URL, e.g. `http://localhost:4444`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// HTTP base URL of the WebDriver endpoint.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a new headless browser session.
    pub async fn new_session(&self) -> Result<WebDriverSession, BrowserError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": ["--headless=new"] }
                }
            }
        });

        let response = self
            .http
            .post(format!("{}/session", self.base_url))
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| {
                BrowserError::Connection(format!(
                    "Failed to connect to WebDriver at {}: {e}",
                    self.base_url
                ))
            })?;
        let body = decode_webdriver_response(response).await?;

        let session_id = body
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("session response had no sessionId".into()))?
            .to_string();

        tracing::info!(session_id = %session_id, "Opened WebDriver session at {}", self.base_url);

        Ok(WebDriverSession {
            base_url: self.base_url.clone(),
            session_id,
            http: self.http.clone(),
        })
    }
}

#[async_trait]
impl SessionFactory for WebDriverClient {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, BrowserError> {
        Ok(Box::new(self.new_session().await?))
    }
}

/// A live WebDriver browser session.
pub struct WebDriverSession {
    base_url: String,
    session_id: String,
    http: reqwest::Client,
}

impl WebDriverSession {
    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{path}", self.base_url, self.session_id)
    }

    async fn get(&self, path: &str) -> Result<Value, BrowserError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| BrowserError::Connection(format!("GET {path} failed: {e}")))?;
        decode_webdriver_response(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BrowserError> {
        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserError::Connection(format!("POST {path} failed: {e}")))?;
        decode_webdriver_response(response).await
    }

    /// Locate the first element matching a CSS selector, returning its
    /// WebDriver element id.
    async fn find_element(&self, selector: &str) -> Result<String, BrowserError> {
        let value = self
            .post(
                "/element",
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BrowserError::Protocol(format!("no element reference returned for '{selector}'"))
            })
    }
}

#[async_trait]
impl AutomationSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.get("/url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("current url was not a string".into()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let value = self.get("/screenshot").await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("screenshot was not base64 text".into()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Protocol(format!("screenshot base64 invalid: {e}")))
    }

    async fn markup(&self) -> Result<String, BrowserError> {
        let value = self.get("/source").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("page source was not a string".into()))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        self.post(&format!("/element/{element}/clear"), json!({}))
            .await?;
        self.post(
            &format!("/element/{element}/value"),
            json!({ "text": value }),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        self.post(&format!("/element/{element}/click"), json!({}))
            .await?;
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, BrowserError> {
        let value = self
            .post(
                "/elements",
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        Ok(value.as_array().is_some_and(|elements| !elements.is_empty()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let response = self
            .http
            .delete(self.url(""))
            .send()
            .await
            .map_err(|e| BrowserError::Connection(format!("DELETE session failed: {e}")))?;
        decode_webdriver_response(response).await?;
        Ok(())
    }
}

/// Unwrap the `{"value": ...}` envelope, mapping WebDriver error payloads
/// to [`BrowserError::Protocol`].
async fn decode_webdriver_response(response: reqwest::Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::Protocol(format!("invalid WebDriver response body: {e}")))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        return Err(BrowserError::Protocol(format!("{error}: {message}")));
    }
    Ok(value)
}
