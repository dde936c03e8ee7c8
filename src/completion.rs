use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::error::ExtractError;
use crate::modes::{ModeConfig, TEMPERATURE};

/// One outbound request: the resolved mode config plus the chunk text and
/// the two optional side-channel blobs (empty string when absent).
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    pub model: &'a str,
    pub config: &'a ModeConfig,
    pub chunk_text: &'a str,
    pub knowledge_base: &'a str,
    pub schema_tool: &'a str,
}

/// Seam between the run orchestrator and the remote completion service,
/// so the sequential chunk loop can be exercised against a mock.
pub trait CompletionApi {
    fn complete(
        &self,
        request: ChunkRequest<'_>,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

/// HTTP client for the completion endpoint.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

impl CompletionApi for HttpCompletionClient {
    fn complete(
        &self,
        request: ChunkRequest<'_>,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send {
        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.config.instruction},
                {"role": "user", "content": format!("{}\n\n{}", request.config.task, request.chunk_text)},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": request.config.max_tokens,
            "knowledge_base": request.knowledge_base,
            "schema_tool": request.schema_tool,
        });

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        async move {
            let response = req.send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ExtractError::Api { status, body });
            }

            let envelope: Value = response.json().await?;
            unwrap_content(&envelope)
        }
    }
}

/// Locate `choices[0].message.content` in the response envelope.
///
/// The real payload may be nested under a `data` field or sit at the top
/// level; try the nested shape first, then fall back to top-level. Anything
/// else is a malformed response, fatal for the run.
pub fn unwrap_content(envelope: &Value) -> Result<String, ExtractError> {
    if let Some(data) = envelope.get("data") {
        if let Some(content) = content_of(data) {
            return Ok(content);
        }
    }
    content_of(envelope).ok_or_else(|| {
        ExtractError::MalformedResponse("no choices/message/content in payload".to_string())
    })
}

fn content_of(payload: &Value) -> Option<String> {
    payload
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
