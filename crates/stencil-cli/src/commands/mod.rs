//! CLI command implementations.

pub mod app;
pub mod check;
pub mod dashboard;
pub mod schema;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use stencil_adapter_http::ReqwestExecutor;
use stencil_adapter_pg::PostgresExecutor;
use stencil_core::{CurrentUser, KeyValue, ProjectConfig, ResourceConnection};
use stencil_policy::AllowAllPolicy;
use stencil_runtime::{AppRunner, DispatchExecutor, InMemoryRepository, TracingAuditSink};
use stencil_sql::DatabaseSchema;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A `key=value` command-line argument. Only the first `=` splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueArg {
    pub key: String,
    pub value: String,
}

impl FromStr for KeyValueArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
        }
    }
}

impl From<&KeyValueArg> for KeyValue {
    fn from(arg: &KeyValueArg) -> Self {
        KeyValue::new(&arg.key, &arg.value)
    }
}

pub fn load_project(config_path: &Path) -> Result<ProjectConfig> {
    ProjectConfig::load_with_context(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))
}

/// Identity for local runs: `current_user` from the project, else "local".
pub fn current_user(config: &ProjectConfig) -> CurrentUser {
    config.current_user.clone().unwrap_or_else(|| CurrentUser {
        id: "local".to_string(),
        ..Default::default()
    })
}

/// Index the project's definitions and any stored schema snapshots.
pub fn build_repository(config: &ProjectConfig) -> Result<InMemoryRepository> {
    let mut repository = InMemoryRepository::from_config(config);

    for resource in &config.resources {
        if !matches!(resource.connection, ResourceConnection::Postgres(_)) {
            continue;
        }
        let Some(path) = config.schema_path(&resource.id) else {
            continue;
        };
        if !path.exists() {
            tracing::debug!(resource = %resource.id, path = %path.display(), "No schema snapshot");
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let schema = DatabaseSchema::from_json(&content)
            .with_context(|| format!("Invalid schema snapshot {}", path.display()))?;
        repository = repository.with_schema(&resource.id, schema);
    }

    Ok(repository)
}

pub fn build_runner(config: &ProjectConfig) -> Result<AppRunner> {
    let executor = DispatchExecutor::new()
        .with_http(Arc::new(ReqwestExecutor::new(HTTP_TIMEOUT)?))
        .with_sql(Arc::new(PostgresExecutor::default()));

    Ok(AppRunner::new(
        Arc::new(build_repository(config)?),
        Arc::new(executor),
        Arc::new(AllowAllPolicy),
        Arc::new(TracingAuditSink),
        config.limits,
    ))
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
