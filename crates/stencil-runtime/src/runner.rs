//! Direct App runs.
//!
//! `AppRunner` ties the collaborators together: it loads definitions from the
//! repository, consults the run policy, compiles and hands the artifact to
//! the executor. Dashboard sessions run their Apps through it as well.

use anyhow::Context;
use std::collections::BTreeMap;
use std::sync::Arc;

use stencil_core::{
    AppDefinition, AppOperation, AppRunResponse, CurrentUser, KeyValue, LimitsConfig, Resource,
    RunInput, SqlQueryConfig,
};
use stencil_policy::RunPolicy;

use crate::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::compiler::AppCompiler;
use crate::error::RuntimeError;
use crate::executor::{CompiledArtifact, ExecutionResponse, Executor};
use crate::repository::AppRepository;

/// Result of executing one App.
#[derive(Debug, Clone)]
pub struct AppExecution {
    pub run_id: String,
    pub app_id: String,
    pub response: ExecutionResponse,
}

pub struct AppRunner {
    repository: Arc<dyn AppRepository>,
    executor: Arc<dyn Executor>,
    policy: Arc<dyn RunPolicy>,
    audit: Arc<dyn AuditSink>,
    compiler: AppCompiler,
    limits: LimitsConfig,
}

impl AppRunner {
    pub fn new(
        repository: Arc<dyn AppRepository>,
        executor: Arc<dyn Executor>,
        policy: Arc<dyn RunPolicy>,
        audit: Arc<dyn AuditSink>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            repository,
            executor,
            policy,
            audit,
            compiler: AppCompiler::new(&limits),
            limits,
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Compile an App without executing it.
    pub async fn compile_app(
        &self,
        app_id: &str,
        inputs: &[RunInput],
        user: &CurrentUser,
        dynamic_body: Option<&[KeyValue]>,
    ) -> Result<CompiledArtifact, RuntimeError> {
        let values = RunInput::collect(inputs, &self.limits.run_input_limits())?;
        let (app, resource) = self.load(app_id).await?;
        self.compile_loaded(&app, &resource, &values, user, dynamic_body)
            .await
    }

    /// Validate, compile and execute an App.
    ///
    /// Validation, compilation and permission failures are errors. A failed
    /// execution is a response with an error status.
    pub async fn run_app(
        &self,
        app_id: &str,
        inputs: &[RunInput],
        user: &CurrentUser,
        dynamic_body: Option<&[KeyValue]>,
    ) -> Result<AppRunResponse, RuntimeError> {
        let values = RunInput::collect(inputs, &self.limits.run_input_limits())?;
        let execution = self.execute(app_id, &values, user, dynamic_body).await?;

        self.audit.record(
            AuditEvent::new(AuditEventKind::AppExecuted, &user.id)
                .app(&execution.app_id)
                .run(&execution.run_id, &execution.response.status),
        );

        Ok(AppRunResponse {
            run_id: execution.run_id,
            status: execution.response.status,
            response: execution.response.response,
            error_message: execution.response.error_message,
        })
    }

    /// Execute an App with raw values keyed by input label.
    pub async fn execute(
        &self,
        app_id: &str,
        values: &BTreeMap<String, String>,
        user: &CurrentUser,
        dynamic_body: Option<&[KeyValue]>,
    ) -> Result<AppExecution, RuntimeError> {
        let (app, resource) = self.load(app_id).await?;

        let allowed = self
            .policy
            .can_run(user, &app)
            .await
            .with_context(|| format!("run policy failed for app '{}'", app.id))?;
        if !allowed {
            tracing::warn!(app_id = %app.id, user = %user.id, "Run denied by policy");
            return Err(RuntimeError::NotPermitted(app.id));
        }

        let artifact = self
            .compile_loaded(&app, &resource, values, user, dynamic_body)
            .await?;

        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(app_id = %app.id, run_id = %run_id, kind = artifact.kind(), "Executing app");

        let response = match self.executor.execute(&resource, &artifact).await {
            Ok(response) => response,
            Err(e) => ExecutionResponse::error(format!("{:#}", e)),
        };

        if response.is_success() {
            tracing::debug!(app_id = %app.id, run_id = %run_id, "App run succeeded");
        } else {
            tracing::warn!(
                app_id = %app.id,
                run_id = %run_id,
                status = %response.status,
                error = response.error_message.as_deref().unwrap_or(""),
                "App run failed"
            );
        }

        Ok(AppExecution {
            run_id,
            app_id: app.id,
            response,
        })
    }

    async fn load(&self, app_id: &str) -> Result<(AppDefinition, Resource), RuntimeError> {
        let app = self
            .repository
            .get_app(app_id)
            .await
            .with_context(|| format!("failed to load app '{}'", app_id))?
            .ok_or_else(|| RuntimeError::AppNotFound(app_id.to_string()))?;

        let resource = self
            .repository
            .get_resource(&app.resource_id)
            .await
            .with_context(|| format!("failed to load resource '{}'", app.resource_id))?
            .ok_or_else(|| RuntimeError::ResourceNotFound(app.resource_id.clone()))?;

        Ok((app, resource))
    }

    async fn compile_loaded(
        &self,
        app: &AppDefinition,
        resource: &Resource,
        values: &BTreeMap<String, String>,
        user: &CurrentUser,
        dynamic_body: Option<&[KeyValue]>,
    ) -> Result<CompiledArtifact, RuntimeError> {
        let schema = match &app.operation {
            AppOperation::Sql(SqlQueryConfig::Gui(_)) => self
                .repository
                .get_schema(&resource.id)
                .await
                .with_context(|| format!("failed to load schema for '{}'", resource.id))?,
            _ => None,
        };

        self.compiler
            .compile(app, resource, values, user, dynamic_body, schema.as_ref())
    }
}
