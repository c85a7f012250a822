//! Appium session driver over the W3C WebDriver HTTP protocol.
//!
//! [`AppiumDriver`] attaches to a session that already exists on an Appium
//! server. It never creates or deletes sessions and issues only three
//! commands:
//!
//! | call | request |
//! |---|---|
//! | [`page_source`](SessionDriver::page_source) | `GET /session/{id}/source` |
//! | [`find_element`](SessionDriver::find_element) | `POST /session/{id}/element` with `{"using", "value"}` |
//! | [`automation_name`](SessionDriver::automation_name) | `GET /session/{id}` |
//!
//! W3C error bodies (`{"value": {"error": ..., "message": ...}}`) are mapped
//! onto [`DriverError`] variants so the resolver can tell a missing element
//! from a dead session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::debug;

use crate::driver::{DriverError, ElementHandle, SessionDriver};

/// Key under which W3C WebDriver returns element references.
const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52f-4f0b2a5ff8f3";

/// Key used by the legacy JSON Wire Protocol.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Per-request timeout. Page sources of large screens can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Driver attached to an existing Appium session.
#[derive(Debug, Clone)]
pub struct AppiumDriver {
    base_url: String,
    session_id: String,
    automation_name: Option<String>,
    client: Client,
}

impl AppiumDriver {
    /// Creates a driver for `session_id` on the Appium server at `url`.
    ///
    /// No request is made until the first call.
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            session_id: session_id.into(),
            automation_name: None,
            client,
        }
    }

    /// Uses `name` instead of reading the `automationName` capability.
    pub fn with_automation_name(mut self, name: impl Into<String>) -> Self {
        self.automation_name = Some(name.into());
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Sends one command and returns the `value` of the response.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = self.session_url(path);
        debug!(%method, %url, "appium request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        let payload: Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(DriverError::CommandFailed(format!("HTTP {}: {}", status, text)));
            }
            Err(e) => return Err(DriverError::JsonParse(e.to_string())),
        };

        if let Some(err) = protocol_error(&payload) {
            debug!(%status, error = %err, "appium command failed");
            return Err(err);
        }
        if !status.is_success() {
            return Err(DriverError::CommandFailed(format!("HTTP {}: {}", status, text)));
        }
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }
}

fn map_transport_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        DriverError::Timeout
    } else if err.is_connect() {
        debug!(error = %err, "appium server unreachable");
        DriverError::NotConnected
    } else {
        DriverError::ConnectionLost(err.to_string())
    }
}

/// Extracts the error of a W3C or legacy JSON Wire response, if any.
fn protocol_error(payload: &Value) -> Option<DriverError> {
    let value = payload.get("value");
    let message = value
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(error) = value.and_then(|v| v.get("error")).and_then(Value::as_str) {
        return Some(match error {
            "no such element" => DriverError::NoSuchElement(message),
            "invalid selector" => DriverError::InvalidSelector(message),
            "invalid session id" => DriverError::NotConnected,
            "timeout" => DriverError::Timeout,
            other => DriverError::CommandFailed(format!("{}: {}", other, message)),
        });
    }

    match payload.get("status").and_then(Value::as_i64) {
        None | Some(0) => None,
        Some(7) => Some(DriverError::NoSuchElement(message)),
        Some(32) => Some(DriverError::InvalidSelector(message)),
        Some(6) => Some(DriverError::NotConnected),
        Some(code) => Some(DriverError::CommandFailed(format!("status {}: {}", code, message))),
    }
}

fn element_id(value: &Value) -> Option<&str> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
}

/// Reads `automationName` from a session's capabilities.
///
/// Accepts the plain and `appium:`-prefixed keys, either at the top level or
/// nested under `capabilities`.
fn automation_name_capability(caps: &Value) -> Option<&str> {
    fn lookup(v: &Value) -> Option<&str> {
        ["automationName", "appium:automationName"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str))
    }
    lookup(caps).or_else(|| caps.get("capabilities").and_then(lookup))
}

#[async_trait]
impl SessionDriver for AppiumDriver {
    async fn page_source(&self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/source", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::JsonParse("page source is not a string".to_string()))
    }

    async fn find_element(&self, strategy: &str, selector: &str) -> Result<ElementHandle, DriverError> {
        let body = json!({ "using": strategy, "value": selector });
        let value = self.command(Method::POST, "/element", Some(body)).await?;
        element_id(&value)
            .map(ElementHandle::new)
            .ok_or_else(|| DriverError::JsonParse(format!("no element reference in {}", value)))
    }

    async fn automation_name(&self) -> Result<String, DriverError> {
        if let Some(name) = &self.automation_name {
            return Ok(name.clone());
        }
        let caps = self.command(Method::GET, "", None).await?;
        automation_name_capability(&caps)
            .map(str::to_string)
            .ok_or_else(|| {
                DriverError::CommandFailed("session capabilities have no automationName".to_string())
            })
    }
}
