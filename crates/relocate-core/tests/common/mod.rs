//! Shared test helpers for relocate-core integration tests.
//!
//! This module provides a scripted in-process session driver, a mock Appium
//! HTTP server, and the page-source fixtures both of them serve.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use relocate_core::driver::{DriverError, ElementHandle, SessionDriver};
use relocate_core::locator_file::UserLocatorEntry;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Android login screen: a title, two text fields and a submit button whose
/// id has changed to `submit_v2`.
pub const ANDROID_LOGIN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<hierarchy index="0" rotation="0">
  <android.widget.FrameLayout index="0" class="android.widget.FrameLayout" package="com.example.app" clickable="false" enabled="true" bounds="[0,0][1080,2340]">
    <android.widget.LinearLayout index="0" class="android.widget.LinearLayout" bounds="[0,0][1080,2340]">
      <android.widget.TextView index="0" class="android.widget.TextView" text="Welcome back" resource-id="com.example.app:id/title" bounds="[40,120][1040,200]"/>
      <android.widget.EditText index="1" class="android.widget.EditText" text="" content-desc="Email" resource-id="com.example.app:id/email" clickable="true" bounds="[40,240][1040,340]"/>
      <android.widget.EditText index="2" class="android.widget.EditText" text="" content-desc="Password" resource-id="com.example.app:id/password" clickable="true" bounds="[40,380][1040,480]"/>
      <android.widget.Button index="3" class="android.widget.Button" text="Submit" resource-id="com.example.app:id/submit_v2" clickable="true" bounds="[40,540][1040,640]"/>
    </android.widget.LinearLayout>
  </android.widget.FrameLayout>
</hierarchy>"#;

/// iOS login screen with the same controls.
pub const IOS_LOGIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AppiumAUT>
  <XCUIElementTypeApplication type="XCUIElementTypeApplication" name="Demo" label="Demo" enabled="true" accessible="false" x="0" y="0" width="390" height="844">
    <XCUIElementTypeStaticText type="XCUIElementTypeStaticText" value="Welcome back" name="title" label="Welcome back" enabled="true" accessible="true" x="20" y="100" width="350" height="40"/>
    <XCUIElementTypeTextField type="XCUIElementTypeTextField" name="email-field" label="Email" enabled="true" accessible="true" x="20" y="160" width="350" height="44"/>
    <XCUIElementTypeSecureTextField type="XCUIElementTypeSecureTextField" name="password-field" label="Password" enabled="true" accessible="true" x="20" y="220" width="350" height="44"/>
    <XCUIElementTypeButton type="XCUIElementTypeButton" name="login-button-v2" label="Log In" enabled="true" accessible="true" x="20" y="300" width="350" height="50"/>
  </XCUIElementTypeApplication>
</AppiumAUT>"#;

/// Android list screen with `count` rows labelled `Item 0`, `Item 1`, ...
pub fn android_list(count: usize) -> String {
    let rows: String = (0..count)
        .map(|i| {
            format!(
                r#"    <android.widget.TextView class="android.widget.TextView" text="Item {i}" resource-id="com.example.app:id/row_{i}" content-desc="row {i}" clickable="true"/>
"#
            )
        })
        .collect();
    format!(
        "<hierarchy>\n  <android.widget.ListView class=\"android.widget.ListView\">\n{}  </android.widget.ListView>\n</hierarchy>",
        rows
    )
}

/// Builds a locator entry the way a locator file would record it.
pub fn entry(element: &str, strategy: &str, selector: &str, field_name: &str) -> UserLocatorEntry {
    UserLocatorEntry {
        page_name: "Login".to_string(),
        page_element_name: element.to_string(),
        strategy: strategy.to_string(),
        selector: selector.to_string(),
        field_name: field_name.to_string(),
        remarks: String::new(),
        auto_heal: true,
    }
}

/// Writes `contents` to a fresh file in the temp directory.
pub fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("relocate-{}-{}", uuid::Uuid::new_v4(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Scripted driver
// ---------------------------------------------------------------------------

/// An in-process [`SessionDriver`] that resolves a fixed set of locators and
/// counts every call made against it.
pub struct ScriptedDriver {
    source: String,
    automation_name: String,
    resolvable: Vec<(String, String)>,
    disconnect_after: Option<usize>,
    page_source_calls: AtomicUsize,
    find_calls: AtomicUsize,
    automation_name_calls: AtomicUsize,
}

impl ScriptedDriver {
    pub fn new(source: impl Into<String>, automation_name: &str) -> Self {
        Self {
            source: source.into(),
            automation_name: automation_name.to_string(),
            resolvable: Vec::new(),
            disconnect_after: None,
            page_source_calls: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
            automation_name_calls: AtomicUsize::new(0),
        }
    }

    pub fn android(source: impl Into<String>) -> Self {
        Self::new(source, "UiAutomator2")
    }

    pub fn ios(source: impl Into<String>) -> Self {
        Self::new(source, "XCUITest")
    }

    /// Makes `find_element(strategy, selector)` succeed.
    pub fn resolving(mut self, strategy: &str, selector: &str) -> Self {
        self.resolvable.push((strategy.to_string(), selector.to_string()));
        self
    }

    /// Makes every `find_element` call after the first `n` report a dead session.
    pub fn disconnect_after(mut self, n: usize) -> Self {
        self.disconnect_after = Some(n);
        self
    }

    pub fn page_source_calls(&self) -> usize {
        self.page_source_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn automation_name_calls(&self) -> usize {
        self.automation_name_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.page_source_calls() + self.find_calls() + self.automation_name_calls()
    }
}

#[async_trait]
impl SessionDriver for ScriptedDriver {
    async fn page_source(&self) -> Result<String, DriverError> {
        self.page_source_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.source.clone())
    }

    async fn find_element(&self, strategy: &str, selector: &str) -> Result<ElementHandle, DriverError> {
        let call = self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.disconnect_after.is_some_and(|n| call >= n) {
            return Err(DriverError::NotConnected);
        }
        self.resolvable
            .iter()
            .position(|(s, v)| s == strategy && v == selector)
            .map(|i| ElementHandle::new(format!("scripted-{}", i)))
            .ok_or_else(|| DriverError::NoSuchElement(format!("{}={}", strategy, selector)))
    }

    async fn automation_name(&self) -> Result<String, DriverError> {
        self.automation_name_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.automation_name.clone())
    }
}

// ---------------------------------------------------------------------------
// Mock Appium server
// ---------------------------------------------------------------------------

/// One canned reply of the mock Appium server.
#[derive(Clone)]
pub struct MockRoute {
    pub method: &'static str,
    pub path: String,
    /// When set, the request body must contain this text.
    pub body_contains: Option<String>,
    pub status: u16,
    pub body: String,
}

impl MockRoute {
    pub fn get(path: &str, status: u16, body: &str) -> Self {
        Self {
            method: "GET",
            path: path.to_string(),
            body_contains: None,
            status,
            body: body.to_string(),
        }
    }

    pub fn post(path: &str, body_contains: &str, status: u16, body: &str) -> Self {
        Self {
            method: "POST",
            path: path.to_string(),
            body_contains: Some(body_contains.to_string()),
            status,
            body: body.to_string(),
        }
    }
}

/// Request lines (`METHOD /path`) seen by a mock server, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock Appium server that answers each request with the first
/// matching route, or a W3C `unknown command` 404.
///
/// Every response closes its connection, so each request arrives on a
/// fresh one.
pub async fn mock_appium(routes: Vec<MockRoute>) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let seen = log.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let Some((method, path, body)) = read_request(&mut stream).await else {
                continue;
            };
            seen.lock().unwrap().push(format!("{} {}", method, path));

            let (status, reply) = routes
                .iter()
                .find(|r| {
                    r.method == method
                        && r.path == path
                        && r.body_contains.as_ref().map_or(true, |needle| body.contains(needle.as_str()))
                })
                .map(|r| (r.status, r.body.clone()))
                .unwrap_or_else(|| {
                    (
                        404,
                        r#"{"value":{"error":"unknown command","message":"no mock route"}}"#.to_string(),
                    )
                });

            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                reply.len(),
                reply
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}", addr), log)
}

/// Returns an address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<(String, String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some((method, path, body))
}
