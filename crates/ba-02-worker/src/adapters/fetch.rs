//! HTTP-fetch executor.
//!
//! A headless stand-in for a browser session: `goto` loads a page over HTTP
//! and keeps it as the current page, `screenshot` writes the current page to
//! disk, `close` ends the session. Once closed, every action reports the
//! session as unusable so the worker reconnects with a fresh one.

use crate::domain::ExecutionError;
use crate::ports::{Executor, ExecutorFactory};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::CommandMessage;
use std::time::Duration;
use tracing::{debug, info};

/// Where `screenshot` writes when no `path` is given.
pub const DEFAULT_SCREENSHOT_PATH: &str = "/tmp/screenshot.png";

#[derive(Debug)]
struct Page {
    url: String,
    body: Vec<u8>,
}

/// One fetch session.
#[derive(Debug)]
pub struct FetchExecutor {
    client: reqwest::Client,
    page: Option<Page>,
    closed: bool,
}

impl FetchExecutor {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            page: None,
            closed: false,
        }
    }

    /// URL of the current page, if any.
    pub fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|page| page.url.as_str())
    }

    async fn goto(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError> {
        let Some(url) = command.str_argument("url").filter(|url| !url.is_empty()) else {
            return Err(ExecutionError::invalid("goto", "Missing URL"));
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExecutionError::failed("goto", e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExecutionError::failed("goto", e))?;

        debug!(url = %url, status = %status, bytes = body.len(), "Page loaded");
        self.page = Some(Page {
            url: url.to_string(),
            body: body.to_vec(),
        });
        Ok(Value::String(format!("Navigated to {url}")))
    }

    async fn screenshot(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError> {
        let path = command
            .str_argument("path")
            .unwrap_or(DEFAULT_SCREENSHOT_PATH);
        let Some(page) = self.page.as_ref() else {
            return Err(ExecutionError::failed("screenshot", "No page loaded"));
        };

        tokio::fs::write(path, &page.body)
            .await
            .map_err(|e| ExecutionError::failed("screenshot", e))?;
        Ok(Value::String(format!("Screenshot saved to {path}")))
    }
}

#[async_trait]
impl Executor for FetchExecutor {
    async fn execute(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceUnusable("Target closed".into()));
        }

        match command.action.as_str() {
            "goto" => self.goto(command).await,
            "screenshot" => self.screenshot(command).await,
            "close" => {
                self.closed = true;
                self.page = None;
                info!("Session closed by command");
                Ok(Value::String("Session closed".into()))
            }
            other => Err(ExecutionError::UnknownAction(other.to_string())),
        }
    }

    async fn shutdown(&mut self) {
        self.closed = true;
        self.page = None;
    }
}

/// Opens a [`FetchExecutor`] per connection, sharing one HTTP client pool.
#[derive(Debug, Clone)]
pub struct FetchExecutorFactory {
    client: reqwest::Client,
}

impl FetchExecutorFactory {
    pub fn new(request_timeout: Duration) -> Result<Self, ExecutionError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ExecutionError::ResourceUnusable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ExecutorFactory for FetchExecutorFactory {
    type Executor = FetchExecutor;

    async fn open(&self) -> Result<FetchExecutor, ExecutionError> {
        Ok(FetchExecutor::new(self.client.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one fixed HTTP response and return the base URL.
    async fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn executor() -> FetchExecutor {
        FetchExecutor::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_goto_then_screenshot_writes_page() {
        let url = serve_once("<h1>hello</h1>").await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let path = path.to_str().unwrap();
        let mut exec = executor();

        let details = exec
            .execute(&CommandMessage::new("goto").with_argument("url", url.as_str()))
            .await
            .unwrap();
        assert_eq!(details, Value::String(format!("Navigated to {url}")));
        assert_eq!(exec.current_url(), Some(url.as_str()));

        let details = exec
            .execute(&CommandMessage::new("screenshot").with_argument("path", path))
            .await
            .unwrap();
        assert_eq!(details, Value::String(format!("Screenshot saved to {path}")));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<h1>hello</h1>");
    }

    #[tokio::test]
    async fn test_goto_without_url() {
        let err = executor()
            .execute(&CommandMessage::new("goto"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::invalid("goto", "Missing URL"));
    }

    #[tokio::test]
    async fn test_screenshot_without_page() {
        let err = executor()
            .execute(&CommandMessage::new("screenshot"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::failed("screenshot", "No page loaded"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let err = executor()
            .execute(&CommandMessage::new("click"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::UnknownAction("click".into()));
    }

    #[tokio::test]
    async fn test_actions_after_close_are_unusable() {
        let mut exec = executor();
        exec.execute(&CommandMessage::new("close")).await.unwrap();

        let err = exec
            .execute(&CommandMessage::new("goto").with_argument("url", "http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(err.is_resource_unusable());
    }

    #[tokio::test]
    async fn test_factory_opens_fresh_sessions() {
        let factory = FetchExecutorFactory::new(Duration::from_secs(5)).unwrap();
        let mut first = factory.open().await.unwrap();
        first.execute(&CommandMessage::new("close")).await.unwrap();

        let mut second = factory.open().await.unwrap();
        let err = second.execute(&CommandMessage::new("screenshot")).await.unwrap_err();
        assert!(!err.is_resource_unusable());
    }
}
