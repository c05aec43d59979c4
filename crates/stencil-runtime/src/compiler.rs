//! Compiles an App against its Resource.

use std::collections::BTreeMap;

use stencil_core::{
    AppDefinition, AppOperation, CurrentUser, KeyValue, LimitsConfig, Resource,
    ResourceConnection,
};
use stencil_http::{HttpCompileRequest, HttpCompiler};
use stencil_sql::{DatabaseSchema, SqlCompileRequest, SqlCompiler};

use crate::error::RuntimeError;
use crate::executor::CompiledArtifact;

/// Picks the HTTP or SQL compiler for an App and checks that its Resource
/// is of the matching kind.
#[derive(Debug, Clone, Default)]
pub struct AppCompiler {
    http: HttpCompiler,
    sql: SqlCompiler,
}

impl AppCompiler {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            http: HttpCompiler::new().with_max_dynamic_body_pairs(limits.max_dynamic_body_pairs),
            sql: SqlCompiler::new(),
        }
    }

    /// Compile with raw values keyed by input label.
    pub fn compile(
        &self,
        app: &AppDefinition,
        resource: &Resource,
        values: &BTreeMap<String, String>,
        current_user: &CurrentUser,
        dynamic_body: Option<&[KeyValue]>,
        schema: Option<&DatabaseSchema>,
    ) -> Result<CompiledArtifact, RuntimeError> {
        let artifact = match (&app.operation, &resource.connection) {
            (AppOperation::Http(http_app), ResourceConnection::Http(http_resource)) => {
                CompiledArtifact::Http(self.http.compile(HttpCompileRequest {
                    resource: http_resource,
                    app: http_app,
                    inputs: &app.inputs,
                    values,
                    current_user,
                    dynamic_body,
                })?)
            }
            (AppOperation::Sql(query), ResourceConnection::Postgres(_)) => {
                CompiledArtifact::Sql(self.sql.compile(SqlCompileRequest {
                    query,
                    inputs: &app.inputs,
                    values,
                    current_user,
                    schema,
                })?)
            }
            (operation, connection) => {
                return Err(RuntimeError::ResourceMismatch {
                    app_id: app.id.clone(),
                    resource_id: resource.id.clone(),
                    expected: match operation {
                        AppOperation::Http(_) => "http",
                        AppOperation::Sql(_) => "postgres",
                    },
                    actual: connection.kind(),
                });
            }
        };

        tracing::debug!(app_id = %app.id, kind = artifact.kind(), "Compiled app");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::{HttpAppConfig, HttpMethod, HttpResource, PostgresResource};

    fn http_app() -> AppDefinition {
        AppDefinition {
            id: "ping".to_string(),
            name: String::new(),
            resource_id: "db".to_string(),
            inputs: vec![],
            operation: AppOperation::Http(HttpAppConfig {
                method: Some(HttpMethod::Get),
                url_path: "/ping".to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_http_app_on_database_resource_is_rejected() {
        let resource = Resource {
            id: "db".to_string(),
            name: String::new(),
            connection: ResourceConnection::Postgres(PostgresResource::default()),
        };
        let err = AppCompiler::default()
            .compile(
                &http_app(),
                &resource,
                &BTreeMap::new(),
                &CurrentUser::default(),
                None,
                None,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            RuntimeError::ResourceMismatch {
                expected: "http",
                actual: "postgres",
                ..
            }
        ));
    }

    #[test]
    fn test_http_app_compiles() {
        let resource = Resource {
            id: "api".to_string(),
            name: String::new(),
            connection: ResourceConnection::Http(HttpResource {
                base_url: "https://a.io".to_string(),
                ..Default::default()
            }),
        };
        let artifact = AppCompiler::new(&LimitsConfig::default())
            .compile(
                &http_app(),
                &resource,
                &BTreeMap::new(),
                &CurrentUser::default(),
                None,
                None,
            )
            .unwrap();
        let CompiledArtifact::Http(request) = artifact else {
            panic!("expected an http artifact");
        };
        assert_eq!(request.base_url, "https://a.io/ping");
    }
}
