//! Minimal W3C WebDriver REST client.
//!
//! Covers the commands needed to drive a single browser window: navigation,
//! CSS element lookup, reading text and attributes, clicking, typing and
//! printing the page to PDF.
//!
//! # Example
//!
//! ```rust,ignore
//! use webdriver_client::{ChromeCapabilities, WebDriverClient};
//!
//! let client = WebDriverClient::new("http://localhost:4444");
//! let session = client.new_session(&ChromeCapabilities::new().headless(true)).await?;
//!
//! session.navigate("https://scholar.google.com/").await?;
//! let html = session.page_source().await?;
//! session.delete().await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, WebDriverError};
pub use types::{ChromeCapabilities, ElementRef, ELEMENT_KEY, ENTER_KEY};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use types::{ErrorValue, Locator, NewSessionValue, ValueEnvelope};

#[derive(Clone)]
pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Start a browser and return a handle to its session.
    pub async fn new_session(&self, capabilities: &ChromeCapabilities) -> Result<Session> {
        let url = format!("{}/session", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&capabilities.to_json())
            .send()
            .await?;

        let created: NewSessionValue = decode(resp).await?;
        tracing::info!(session_id = %created.session_id, "WebDriver session started");

        Ok(Session {
            client: self.client.clone(),
            url: format!("{}/session/{}", self.base_url, created.session_id),
            id: created.session_id,
        })
    }
}

/// One live browser session.
#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    url: String,
    id: String,
}

impl Session {
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url })).await
    }

    /// All elements in the document matching a CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        self.post("/elements", Locator::css(selector)).await
    }

    /// Descendants of `element` matching a CSS selector.
    pub async fn find_elements_from(
        &self,
        element: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>> {
        let path = format!("/element/{}/elements", element.id);
        self.post(&path, Locator::css(selector)).await
    }

    /// Rendered text of an element.
    pub async fn element_text(&self, element: &ElementRef) -> Result<String> {
        self.get(&format!("/element/{}/text", element.id)).await
    }

    /// Attribute (or property) value; `None` when unset.
    pub async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>> {
        self.get(&format!("/element/{}/attribute/{}", element.id, name))
            .await
    }

    pub async fn element_click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.id), json!({}))
            .await
    }

    pub async fn element_clear(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/clear", element.id), json!({}))
            .await
    }

    /// Type into an element. Use [`ENTER_KEY`] to submit.
    pub async fn element_send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(
            &format!("/element/{}/value", element.id),
            json!({ "text": text }),
        )
        .await
    }

    /// Serialized DOM of the current document.
    pub async fn page_source(&self) -> Result<String> {
        self.get("/source").await
    }

    /// Print the current page, returning the PDF bytes.
    pub async fn print_pdf(&self) -> Result<Vec<u8>> {
        let encoded: String = self.post("/print", json!({ "background": true })).await?;
        Ok(STANDARD.decode(encoded)?)
    }

    /// End the session and close the browser.
    pub async fn delete(&self) -> Result<()> {
        let resp = self.client.delete(&self.url).send().await?;
        let _: Value = decode(resp).await?;
        tracing::info!(session_id = %self.id, "WebDriver session closed");
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}{}", self.url, path))
            .send()
            .await?;
        decode(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl serde::Serialize,
    ) -> Result<T> {
        let resp = self
            .client
            .post(format!("{}{}", self.url, path))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }
}

/// Unwrap the `value` envelope, turning error bodies into [`WebDriverError::Command`].
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(command_error(status.as_u16(), &body));
    }

    let envelope: ValueEnvelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.value)
}

fn command_error(status: u16, body: &str) -> WebDriverError {
    match serde_json::from_str::<ValueEnvelope<ErrorValue>>(body) {
        Ok(envelope) => WebDriverError::Command {
            status,
            error: envelope.value.error,
            message: envelope.value.message,
        },
        Err(_) => WebDriverError::Command {
            status,
            error: "unknown error".to_string(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_from_w3c_body() {
        let err = command_error(
            404,
            r#"{"value": {"error": "no such element", "message": "Unable to locate"}}"#,
        );

        assert!(err.is_no_such_element());
        assert!(err.to_string().contains("Unable to locate"));
    }

    #[test]
    fn test_command_error_from_plain_body() {
        let err = command_error(500, "driver crashed");

        assert_eq!(err.code(), Some("unknown error"));
        assert!(!err.is_no_such_element());
        assert!(err.to_string().contains("driver crashed"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = WebDriverClient::new("http://localhost:4444/");
        assert_eq!(client.base_url, "http://localhost:4444");
    }
}
