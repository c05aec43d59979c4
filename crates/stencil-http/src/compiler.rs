//! HTTP request compilation.
//!
//! Combines a Resource's base configuration with an App's templates and the
//! caller's values:
//!
//! 1. Validate the App's inputs (all errors aggregated)
//! 2. Resolve the URL path and join it onto the base URL
//! 3. Resolve parameters and headers, resource entries first
//! 4. Resolve the static body, or pass the dynamic body through untouched
//!
//! Unresolved placeholders are collected across every template before the
//! compilation fails.

use std::collections::BTreeMap;

use stencil_core::{
    CurrentUser, ExecutableHttpRequest, HttpAppConfig, HttpResource, InputField, KeyValue,
};
use stencil_policy::FieldValidator;
use stencil_template::{BatchResolver, PlaceholderValues};

use crate::error::CompileError;

/// Everything needed to compile one HTTP App run.
#[derive(Debug, Clone, Copy)]
pub struct HttpCompileRequest<'a> {
    pub resource: &'a HttpResource,
    pub app: &'a HttpAppConfig,
    /// The App's declared inputs.
    pub inputs: &'a [InputField],
    /// Raw values keyed by input label.
    pub values: &'a BTreeMap<String, String>,
    pub current_user: &'a CurrentUser,
    /// Caller-supplied body pairs, used when the App has a dynamic body.
    pub dynamic_body: Option<&'a [KeyValue]>,
}

/// Compiles HTTP Apps into [`ExecutableHttpRequest`]s.
#[derive(Debug, Clone)]
pub struct HttpCompiler {
    validator: FieldValidator,
    max_dynamic_body_pairs: usize,
}

impl Default for HttpCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCompiler {
    pub fn new() -> Self {
        Self {
            validator: FieldValidator::new(),
            max_dynamic_body_pairs: 10,
        }
    }

    /// Set the maximum number of dynamic body pairs.
    pub fn with_max_dynamic_body_pairs(mut self, max: usize) -> Self {
        self.max_dynamic_body_pairs = max;
        self
    }

    pub fn compile(
        &self,
        request: HttpCompileRequest<'_>,
    ) -> Result<ExecutableHttpRequest, CompileError> {
        let method = request.app.method.ok_or(CompileError::MissingMethod)?;

        if request.resource.base_url.trim().is_empty() {
            return Err(CompileError::MissingBaseUrl);
        }

        let validated = self
            .validator
            .validate_by_label(request.inputs, request.values)?;

        let mut values = PlaceholderValues::new().with_current_user(request.current_user);
        // Declared inputs win over the reserved namespace.
        values.extend(validated.rendered_by_label());

        let mut resolver = BatchResolver::new(&values);

        let path = resolver.resolve(&request.app.url_path);
        let url_parameters = resolver.resolve_pairs(
            request
                .resource
                .url_parameters
                .iter()
                .chain(&request.app.url_parameters),
        );
        let headers = resolver.resolve_pairs(
            request
                .resource
                .headers
                .iter()
                .chain(&request.app.headers),
        );

        let mut body = resolver.resolve_pairs(&request.resource.body);
        if request.app.dynamic_body {
            let supplied = request.dynamic_body.unwrap_or_default();
            if supplied.len() > self.max_dynamic_body_pairs {
                return Err(CompileError::DynamicBodyTooLarge {
                    count: supplied.len(),
                    max: self.max_dynamic_body_pairs,
                });
            }
            body.extend(supplied.iter().cloned());
        } else {
            body.extend(resolver.resolve_pairs(&request.app.body));
        }

        resolver.finish()?;

        let compiled = ExecutableHttpRequest {
            base_url: join_url(&request.resource.base_url, &path),
            url_parameters,
            headers,
            body,
            http_method: method.as_str().to_string(),
        };

        tracing::debug!(
            method = %compiled.http_method,
            url = %compiled.base_url,
            params = compiled.url_parameters.len(),
            headers = compiled.headers.len(),
            body = compiled.body.len(),
            "Compiled HTTP request"
        );

        Ok(compiled)
    }
}

/// Join a base URL and a path with exactly one separating slash.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", base, path)
}
