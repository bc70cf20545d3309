//! Minimal W3C WebDriver client
//!
//! Only the handful of commands the browser backend needs: open a session,
//! navigate, find elements by id, type, click, read properties, close.
//! Every command is a JSON request whose reply wraps its payload in
//! `{"value": ...}`; failures carry `{"value": {"error", "message"}}`.

use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::debug;

use gramtest_common::{Error, Result};

/// Key under which W3C drivers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Reference to an element inside a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// An open WebDriver session
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Open a new session for `browser_name` on the driver at `endpoint`
    pub async fn create(endpoint: &str, browser_name: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let body = json!({
            "capabilities": {
                "alwaysMatch": { "browserName": browser_name }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", endpoint), Some(body), "new session").await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::webdriver("new session", format!("no sessionId in reply: {}", value)))?
            .to_string();

        debug!("Opened WebDriver session {} ({})", session_id, browser_name);
        Ok(Self {
            client,
            endpoint,
            session_id,
        })
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>, name: &str) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        send(&self.client, method, &url, body, name).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })), "navigate")
            .await?;
        Ok(())
    }

    /// Locate the element whose `id` attribute is `id`
    pub async fn find_element_by_id(&self, id: &str) -> Result<ElementRef> {
        let command = format!("find element #{}", id);
        let body = json!({ "using": "css selector", "value": format!("#{}", id) });
        let value = self.command(Method::POST, "/element", Some(body), &command).await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| Error::webdriver(command, format!("no element reference in reply: {}", value)))
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        let path = format!("/element/{}/value", element.id());
        self.command(Method::POST, &path, Some(json!({ "text": text })), "send keys")
            .await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        let path = format!("/element/{}/click", element.id());
        self.command(Method::POST, &path, Some(json!({})), "click").await?;
        Ok(())
    }

    /// Current DOM property of an element (`value` for text areas)
    pub async fn element_property(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let path = format!("/element/{}/property/{}", element.id(), name);
        let value = self.command(Method::GET, &path, None, "element property").await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Delete the session
    pub async fn close(self) -> Result<()> {
        debug!("Closing WebDriver session {}", self.session_id);
        self.command(Method::DELETE, "", None, "delete session").await?;
        Ok(())
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>, name: &str) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::webdriver(name, e.to_string()))?;
    let status = response.status();
    let reply: Value = response
        .json()
        .await
        .map_err(|e| Error::webdriver(name, format!("unreadable reply ({}): {}", status, e)))?;
    let value = reply.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
        return Err(Error::webdriver(name, format!("{} ({}): {}", error, status, message)));
    }

    Ok(value)
}
