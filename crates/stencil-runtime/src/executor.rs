//! Execution collaborator.
//!
//! The engine compiles; an [`Executor`] sends the compiled artifact to the
//! outside world and reports back. Executors are the only suspension point.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use stencil_core::wire::{STATUS_ERROR, STATUS_SUCCESS};
use stencil_core::{ExecutableHttpRequest, Resource, is_success_status};
use stencil_sql::CompiledStatement;

/// What a compiled App turns into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CompiledArtifact {
    Http(ExecutableHttpRequest),
    Sql(CompiledStatement),
}

impl CompiledArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            CompiledArtifact::Http(_) => "http",
            CompiledArtifact::Sql(_) => "sql",
        }
    }
}

/// Outcome reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionResponse {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            response: Some(response.into()),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            response: None,
            error_message: Some(message.into()),
        }
    }

    /// Success is decided by the status string alone.
    pub fn is_success(&self) -> bool {
        is_success_status(Some(&self.status))
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a compiled artifact against its resource.
    ///
    /// `Err` is reserved for transport failures; the runtime reports it the
    /// same way as an error status.
    async fn execute(
        &self,
        resource: &Resource,
        artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse>;
}

/// Routes HTTP requests and SQL statements to separate executors.
#[derive(Clone, Default)]
pub struct DispatchExecutor {
    http: Option<Arc<dyn Executor>>,
    sql: Option<Arc<dyn Executor>>,
}

impl DispatchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, executor: Arc<dyn Executor>) -> Self {
        self.http = Some(executor);
        self
    }

    pub fn with_sql(mut self, executor: Arc<dyn Executor>) -> Self {
        self.sql = Some(executor);
        self
    }
}

#[async_trait]
impl Executor for DispatchExecutor {
    async fn execute(
        &self,
        resource: &Resource,
        artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse> {
        let executor = match artifact {
            CompiledArtifact::Http(_) => self.http.as_ref(),
            CompiledArtifact::Sql(_) => self.sql.as_ref(),
        };
        match executor {
            Some(executor) => executor.execute(resource, artifact).await,
            None => anyhow::bail!("no executor configured for {} artifacts", artifact.kind()),
        }
    }
}
