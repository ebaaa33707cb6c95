/// Execution Engine - Boundary to the Remote Code Runner
///
/// **Core Responsibility:**
/// Send one source snippet plus stdin to the sandboxed execution service
/// and hand back its raw response.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to reach the runner (HTTP, headers, timeouts)
/// - Engine does NOT know test cases or scoring rules
/// - Engine does NOT retry; one failure is reported as-is
///
/// This is the only place network latency and sandbox scheduling enter
/// the evaluation pipeline. Everything behind `CodeExecutor` can be
/// replaced by a deterministic fake.

use async_trait::async_trait;
use codegrade_common::config::JudgeConfig;
use codegrade_common::types::{ExecutionRequest, ExecutionResult};
use codegrade_common::{EngineError, EngineResult};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Capability to execute a single program run
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `request` to completion. Fails with `ServiceUnavailable` or `Timeout`.
    async fn execute(&self, request: &ExecutionRequest) -> EngineResult<ExecutionResult>;
}

/// HTTP client for a Judge0-compatible execution service
pub struct Judge0Engine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_host: Option<String>,
    timeout_secs: u64,
}

impl Judge0Engine {
    pub fn new(config: &JudgeConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::ServiceUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_host: config.api_host.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn submissions_url(&self) -> String {
        format!("{}/submissions?base64_encoded=false&wait=true", self.base_url)
    }

    fn classify(&self, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout(self.timeout_secs)
        } else {
            EngineError::ServiceUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl CodeExecutor for Judge0Engine {
    async fn execute(&self, request: &ExecutionRequest) -> EngineResult<ExecutionResult> {
        debug!(
            language_id = request.language_id,
            source_size = request.source_code.len(),
            stdin_size = request.stdin.len(),
            "Dispatching execution request"
        );

        let mut builder = self.client.post(self.submissions_url()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-RapidAPI-Key", key);
        }
        if let Some(host) = &self.api_host {
            builder = builder.header("X-RapidAPI-Host", host);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Execution service rejected request");
            return Err(EngineError::ServiceUnavailable(format!(
                "execution service returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let fields: Map<String, Value> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(self.timeout_secs)
            } else {
                EngineError::ServiceUnavailable(format!("malformed execution response: {}", e))
            }
        })?;

        Ok(ExecutionResult::from_map(fields))
    }
}
