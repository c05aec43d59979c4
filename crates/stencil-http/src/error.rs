//! Error types for HTTP compilation.

use stencil_policy::FieldErrors;
use stencil_template::UnresolvedToken;
use thiserror::Error;

/// Errors that abort HTTP compilation. No partial request is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// One or more inputs failed validation.
    #[error("invalid inputs: {0}")]
    Validation(FieldErrors),

    /// Templates reference values that do not exist.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedToken),

    /// The App does not declare an HTTP method.
    #[error("http method is not set")]
    MissingMethod,

    /// The resource has no base URL.
    #[error("resource base url is empty")]
    MissingBaseUrl,

    /// Too many caller-supplied body pairs.
    #[error("dynamic body has {count} pairs (max {max})")]
    DynamicBodyTooLarge { count: usize, max: usize },
}

impl From<FieldErrors> for CompileError {
    fn from(errors: FieldErrors) -> Self {
        CompileError::Validation(errors)
    }
}
