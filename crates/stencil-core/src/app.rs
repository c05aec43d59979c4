//! Apps and the Resources they build upon.

use serde::{Deserialize, Serialize};

use crate::field::InputField;
use crate::sql::SqlQueryConfig;

/// An ordered `(key, value)` pair whose value may contain placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered pairs. Keys may repeat; every pair is emitted in order.
pub type TemplatedCollection = Vec<KeyValue>;

/// HTTP verbs an App may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP operation of an App.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAppConfig {
    /// Never inferred: an App without a method cannot be compiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    /// Path template appended to the resource base URL.
    #[serde(default)]
    pub url_path: String,

    #[serde(default)]
    pub url_parameters: TemplatedCollection,

    #[serde(default)]
    pub headers: TemplatedCollection,

    /// Static body entries. Ignored when `dynamic_body` is set.
    #[serde(default)]
    pub body: TemplatedCollection,

    /// Body pairs are supplied wholesale by the caller at run time.
    #[serde(default)]
    pub dynamic_body: bool,
}

/// What an App does when run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppOperation {
    Http(HttpAppConfig),
    Sql(SqlQueryConfig),
}

/// A stored, parameterized HTTP or SQL operation bound to a Resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Resource the operation runs against.
    pub resource_id: String,

    /// Inputs, addressed by label in templates.
    #[serde(default)]
    pub inputs: Vec<InputField>,

    /// Written as a single-key map, e.g. `operation: { http: ... }`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub operation: AppOperation,
}

impl AppDefinition {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Stored connection profile an App builds upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(with = "serde_yaml::with::singleton_map")]
    pub connection: ResourceConnection,
}

/// Connection kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceConnection {
    Http(HttpResource),
    Postgres(PostgresResource),
}

impl ResourceConnection {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceConnection::Http(_) => "http",
            ResourceConnection::Postgres(_) => "postgres",
        }
    }
}

/// Base HTTP configuration. Its collections are emitted before an App's own.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResource {
    pub base_url: String,

    #[serde(default)]
    pub url_parameters: TemplatedCollection,

    #[serde(default)]
    pub headers: TemplatedCollection,

    #[serde(default)]
    pub body: TemplatedCollection,
}

/// Postgres connection profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresResource {
    /// Connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Environment variable containing the connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_env: Option<String>,
}

impl PostgresResource {
    /// Get the connection URL, checking `url_env` first.
    pub fn connection_url(&self) -> Option<String> {
        if let Some(env_var) = &self.url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return Some(url);
        }
        self.url.clone()
    }
}
