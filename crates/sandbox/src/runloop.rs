//! Runloop devbox client.
//!
//! Each execution context is a Runloop devbox. Creation is asynchronous on
//! the service side: `create` returns the new devbox id right away and
//! `wait_ready` polls its status until it reports `running`, fails, or the
//! provisioning timeout runs out.

use async_trait::async_trait;
use logdetective_config::SandboxConfig;
use logdetective_core::error::SandboxError;
use logdetective_core::sandbox::{CommandOutput, ContextId, ContextState, ExecutionContext, Sandbox};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_BASE_URL: &str = "https://api.runloop.ai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Builder for [`RunloopSandbox`].
pub struct RunloopSandboxBuilder {
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    provision_timeout: Duration,
}

impl RunloopSandboxBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key for Bearer authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn provision_timeout(mut self, timeout: Duration) -> Self {
        self.provision_timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RunloopSandbox, SandboxError> {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&format!("logdetective/{CLIENT_VERSION}")) {
            headers.insert(USER_AGENT, agent);
        }
        let key = self
            .api_key
            .ok_or_else(|| SandboxError::AuthenticationFailed("no API key configured".into()))?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| SandboxError::AuthenticationFailed(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        Ok(RunloopSandbox {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            http,
            poll_interval: self.poll_interval,
            provision_timeout: self.provision_timeout,
        })
    }
}

/// Client for the Runloop devbox API.
#[derive(Clone)]
pub struct RunloopSandbox {
    base_url: String,
    http: reqwest::Client,
    poll_interval: Duration,
    provision_timeout: Duration,
}

impl RunloopSandbox {
    pub fn builder() -> RunloopSandboxBuilder {
        RunloopSandboxBuilder {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            poll_interval: Duration::from_secs(2),
            provision_timeout: Duration::from_secs(300),
        }
    }

    /// Build a client from the `[sandbox]` configuration section.
    pub fn from_config(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .poll_interval(Duration::from_millis(config.poll_interval_ms))
            .provision_timeout(Duration::from_secs(config.provision_timeout_secs));
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<reqwest::Response, SandboxError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.request(method, &url);
        if let Some(b) = body {
            req = req.header(CONTENT_TYPE, "application/json").json(b);
        }

        let response = req
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        if status >= 400 {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_status(status, &text));
        }
        Ok(response)
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T, SandboxError> {
        let response = self.request(method, path, body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| SandboxError::ApiError {
            status_code: 200,
            message: format!("unexpected response body: {e}"),
        })
    }

    async fn get_devbox(&self, id: &str) -> Result<DevboxView, SandboxError> {
        self.request_json(
            reqwest::Method::GET,
            &format!("/v1/devboxes/{id}"),
            None::<&()>,
        )
        .await
    }

    /// Poll until the devbox is running.
    async fn await_running(&self, mut devbox: DevboxView) -> Result<DevboxView, SandboxError> {
        let deadline = tokio::time::Instant::now() + self.provision_timeout;
        loop {
            match devbox.status.as_str() {
                "running" => return Ok(devbox),
                "failure" | "shutdown" => {
                    return Err(SandboxError::Provisioning(format!(
                        "devbox {} entered '{}' while starting{}",
                        devbox.id,
                        devbox.status,
                        devbox
                            .failure_reason
                            .as_deref()
                            .map(|r| format!(": {r}"))
                            .unwrap_or_default()
                    )));
                }
                other => debug!(devbox = %devbox.id, status = other, "Waiting for devbox"),
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(SandboxError::Provisioning(format!(
                    "devbox {} not running after {}s (last status '{}')",
                    devbox.id,
                    self.provision_timeout.as_secs(),
                    devbox.status
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            devbox = self.get_devbox(&devbox.id).await?;
        }
    }
}

#[async_trait]
impl Sandbox for RunloopSandbox {
    fn name(&self) -> &str {
        "runloop"
    }

    async fn create(&self) -> Result<ExecutionContext, SandboxError> {
        let devbox: DevboxView = self
            .request_json(
                reqwest::Method::POST,
                "/v1/devboxes",
                Some(&serde_json::json!({})),
            )
            .await?;
        info!(devbox = %devbox.id, status = %devbox.status, "Devbox created");

        let state = if devbox.status == "running" {
            ContextState::Ready
        } else {
            ContextState::Provisioning
        };
        Ok(ExecutionContext::new(devbox.id, state))
    }

    async fn wait_ready(&self, ctx: &ExecutionContext) -> Result<ExecutionContext, SandboxError> {
        if ctx.is_ready() {
            return Ok(ctx.clone());
        }
        let devbox = self.get_devbox(ctx.id.as_str()).await?;
        let devbox = self.await_running(devbox).await?;
        Ok(ExecutionContext::new(devbox.id, ContextState::Ready))
    }

    async fn execute(&self, id: &ContextId, command: &str) -> Result<CommandOutput, SandboxError> {
        let body = ExecuteRequest { command };
        let result: ExecutionView = self
            .request_json(
                reqwest::Method::POST,
                &format!("/v1/devboxes/{id}/execute_sync"),
                Some(&body),
            )
            .await?;
        Ok(CommandOutput {
            exit_status: result.exit_status,
            stdout: result.stdout.unwrap_or_default(),
            stderr: result.stderr.unwrap_or_default(),
        })
    }

    async fn read_file(&self, id: &ContextId, path: &str) -> Result<String, SandboxError> {
        let body = ReadFileRequest { file_path: path };
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/devboxes/{id}/read_file_contents"),
                Some(&body),
            )
            .await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let text = response
            .text()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        // Contents arrive as plain text, or as a JSON string on some deployments
        if is_json && let Ok(contents) = serde_json::from_str::<String>(&text) {
            return Ok(contents);
        }
        Ok(text)
    }

    async fn write_file(
        &self,
        id: &ContextId,
        path: &str,
        contents: &str,
    ) -> Result<(), SandboxError> {
        let body = WriteFileRequest {
            file_path: path,
            contents,
        };
        self.request(
            reqwest::Method::POST,
            &format!("/v1/devboxes/{id}/write_file_contents"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn shutdown(&self, id: &ContextId) -> Result<(), SandboxError> {
        self.request(
            reqwest::Method::POST,
            &format!("/v1/devboxes/{id}/shutdown"),
            None::<&()>,
        )
        .await?;
        Ok(())
    }
}

/// Map an HTTP status + body to the appropriate error variant.
pub fn error_from_status(status: u16, body: &str) -> SandboxError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|e| e.as_str().map(String::from))
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => SandboxError::AuthenticationFailed(message),
        404 => SandboxError::NotFound(message),
        _ => SandboxError::ApiError {
            status_code: status,
            message,
        },
    }
}

// --- Runloop API types (internal) ---

#[derive(Debug, Clone, Deserialize)]
struct DevboxView {
    id: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    command: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecutionView {
    #[serde(default)]
    exit_status: Option<i32>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReadFileRequest<'a> {
    file_path: &'a str,
}

#[derive(Debug, Serialize)]
struct WriteFileRequest<'a> {
    file_path: &'a str,
    contents: &'a str,
}
