//! Read-only access to App and Resource definitions.

use async_trait::async_trait;
use std::collections::HashMap;

use stencil_core::{AppDefinition, ProjectConfig, Resource};
use stencil_sql::DatabaseSchema;

#[async_trait]
pub trait AppRepository: Send + Sync {
    async fn get_app(&self, id: &str) -> anyhow::Result<Option<AppDefinition>>;

    async fn get_resource(&self, id: &str) -> anyhow::Result<Option<Resource>>;

    /// Schema snapshot of a database resource, if one exists.
    async fn get_schema(&self, _resource_id: &str) -> anyhow::Result<Option<DatabaseSchema>> {
        Ok(None)
    }
}

/// Repository backed by in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    apps: HashMap<String, AppDefinition>,
    resources: HashMap<String, Resource>,
    schemas: HashMap<String, DatabaseSchema>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the Apps and Resources of a project.
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut repo = Self::new();
        for resource in &config.resources {
            repo = repo.with_resource(resource.clone());
        }
        for app in &config.apps {
            repo = repo.with_app(app.clone());
        }
        repo
    }

    pub fn with_app(mut self, app: AppDefinition) -> Self {
        self.apps.insert(app.id.clone(), app);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource.id.clone(), resource);
        self
    }

    pub fn with_schema(mut self, resource_id: impl Into<String>, schema: DatabaseSchema) -> Self {
        self.schemas.insert(resource_id.into(), schema);
        self
    }
}

#[async_trait]
impl AppRepository for InMemoryRepository {
    async fn get_app(&self, id: &str) -> anyhow::Result<Option<AppDefinition>> {
        Ok(self.apps.get(id).cloned())
    }

    async fn get_resource(&self, id: &str) -> anyhow::Result<Option<Resource>> {
        Ok(self.resources.get(id).cloned())
    }

    async fn get_schema(&self, resource_id: &str) -> anyhow::Result<Option<DatabaseSchema>> {
        Ok(self.schemas.get(resource_id).cloned())
    }
}
