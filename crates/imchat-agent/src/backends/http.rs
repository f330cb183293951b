use super::{CompletionBackend, CompletionRequest};
use crate::config::{ApiType, EndpointConfig};
use async_trait::async_trait;
use imchat_core::{ImChatError, ImChatResult};
use std::time::Duration;
use tracing::debug;

/// HTTP backend for the legacy text-completions API.
///
/// Works with Azure OpenAI deployments and any OpenAI-compatible
/// `/v1/completions` endpoint.
pub struct HttpCompletionBackend {
    endpoint: EndpointConfig,
    http: reqwest::Client,
}

impl HttpCompletionBackend {
    pub fn new(endpoint: EndpointConfig) -> ImChatResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.request_timeout_secs))
            .build()
            .map_err(|e| ImChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { endpoint, http })
    }

    fn build_body(&self, request: &CompletionRequest) -> ImChatResult<serde_json::Value> {
        let mut body = serde_json::to_value(request)?;
        // Azure selects the model through the deployment path
        if self.endpoint.api_type == ApiType::Azure {
            if let Some(fields) = body.as_object_mut() {
                fields.remove("model");
            }
        }
        Ok(body)
    }

    fn add_auth_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.endpoint.api_type {
            ApiType::Azure => request.header("api-key", &self.endpoint.api_key),
            ApiType::OpenAi => request.bearer_auth(&self.endpoint.api_key),
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> ImChatResult<String> {
        let url = self.endpoint.completions_url(&request.model);
        let body = self.build_body(request)?;
        debug!(url = %url, prompt_len = request.prompt.len(), "Sending completion request");

        let resp = self
            .add_auth_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImChatError::Upstream(format!(
                        "request timed out after {}s",
                        self.endpoint.request_timeout_secs
                    ))
                } else {
                    ImChatError::Upstream(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ImChatError::Upstream(format!(
                "completion API error {status}: {error_body}"
            )));
        }

        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ImChatError::MalformedResponse(e.to_string()))?;

        parse_completion_response(&resp_body)
    }
}

/// Extracts `choices[0].text`, trimmed.
pub fn parse_completion_response(body: &serde_json::Value) -> ImChatResult<String> {
    body["choices"][0]["text"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            ImChatError::MalformedResponse(format!("no choices[0].text in response: {body}"))
        })
}
