//! `stencil schema snapshot`: store a database resource's schema for GUI-mode SQL.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use stencil_core::{ProjectConfig, ResourceConnection};

use super::load_project;

/// Connection URL and snapshot path for a postgres resource.
fn snapshot_target(config: &ProjectConfig, resource_id: &str) -> Result<(String, PathBuf)> {
    let resource = config
        .get_resource(resource_id)
        .with_context(|| format!("Resource '{}' not found", resource_id))?;

    let ResourceConnection::Postgres(pg) = &resource.connection else {
        anyhow::bail!(
            "Resource '{}' is a {} resource; only postgres resources have a schema",
            resource_id,
            resource.connection.kind()
        );
    };
    let url = pg
        .connection_url()
        .with_context(|| format!("Resource '{}' has no connection URL", resource_id))?;
    let path = config
        .schema_path(resource_id)
        .context("Set `schema_dir` in the project configuration to store schema snapshots")?;

    Ok((url, path))
}

pub async fn snapshot(config_path: &Path, resource_id: &str) -> Result<()> {
    let config = load_project(config_path)?;
    let (url, path) = snapshot_target(&config, resource_id)?;

    let schema = stencil_adapter_pg::introspect_url(&url)
        .await
        .with_context(|| format!("Failed to introspect resource '{}'", resource_id))?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(&path, schema.to_json()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(resource = %resource_id, tables = schema.tables.len(), "Schema snapshot written");
    println!("✅ Wrote {}", path.display());
    Ok(())
}
