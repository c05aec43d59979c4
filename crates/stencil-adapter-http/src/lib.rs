//! HTTP executor for compiled requests.
//!
//! Sends an [`ExecutableHttpRequest`] with `reqwest`: URL parameters become the
//! query string, headers are sent as given and a non-empty body is sent as a
//! JSON object. Any 2xx status is a success.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;

use stencil_core::wire::STATUS_ERROR;
use stencil_core::{ExecutableHttpRequest, KeyValue, Resource};
use stencil_runtime::{CompiledArtifact, ExecutionResponse, Executor};

/// Longest error body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Body pairs as a JSON object. A repeated key keeps its last value.
fn json_body(body: &[KeyValue]) -> serde_json::Value {
    let map = body
        .iter()
        .map(|kv| (kv.key.clone(), serde_json::Value::String(kv.value.clone())))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

fn query_pairs(params: &[KeyValue]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|kv| (kv.key.as_str(), kv.value.as_str()))
        .collect()
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

pub struct ReqwestExecutor {
    http: Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Build the outgoing request without sending it.
    pub fn build_request(&self, request: &ExecutableHttpRequest) -> anyhow::Result<reqwest::Request> {
        let method = Method::from_bytes(request.http_method.as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", request.http_method))?;

        let mut builder = self
            .http
            .request(method, &request.base_url)
            .query(&query_pairs(&request.url_parameters));
        for header in &request.headers {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.json(&json_body(&request.body));
        }

        builder
            .build()
            .with_context(|| format!("invalid request to {}", request.base_url))
    }
}

#[async_trait]
impl Executor for ReqwestExecutor {
    async fn execute(
        &self,
        resource: &Resource,
        artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse> {
        let CompiledArtifact::Http(request) = artifact else {
            anyhow::bail!("http executor cannot run {} artifacts", artifact.kind());
        };

        let outgoing = self.build_request(request)?;
        tracing::debug!(
            resource = %resource.id,
            method = %outgoing.method(),
            url = %outgoing.url(),
            "Sending request"
        );

        let response = self
            .http
            .execute(outgoing)
            .await
            .with_context(|| format!("Failed to reach {}", request.base_url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", request.base_url))?;

        if status.is_success() {
            Ok(ExecutionResponse::success(body))
        } else {
            tracing::warn!(resource = %resource.id, status = %status, "Request failed");
            Ok(ExecutionResponse {
                status: STATUS_ERROR.to_string(),
                error_message: Some(format!("HTTP {}: {}", status, truncate(&body))),
                response: Some(body),
            })
        }
    }
}
