//! Runtime error types.

use stencil_core::RunInputError;
use stencil_http::CompileError;
use stencil_policy::FieldErrors;
use stencil_sql::SqlCompileError;
use stencil_template::UnresolvedToken;
use thiserror::Error;

use crate::session::Phase;

/// A binding could not produce a value. Blocks only the action it belongs to.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("binding for '{input_name}' references unknown field '{field_id}'")]
    UnknownField {
        input_name: String,
        field_id: String,
    },

    #[error("binding for '{input_name}' found nothing at prepare output path '{path}'")]
    MissingPath { input_name: String, path: String },

    #[error("binding for '{input_name}': {source}")]
    Unresolved {
        input_name: String,
        #[source]
        source: UnresolvedToken,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("app not found: {0}")]
    AppNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("app '{app_id}' needs a {expected} resource but '{resource_id}' is {actual}")]
    ResourceMismatch {
        app_id: String,
        resource_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("not permitted to run app '{0}'")]
    NotPermitted(String),

    #[error(transparent)]
    InvalidRunInput(#[from] RunInputError),

    #[error("invalid inputs: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    HttpCompile(#[from] CompileError),

    #[error(transparent)]
    SqlCompile(#[from] SqlCompileError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("operation needs phase {expected}, session is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("another run is already in flight for this session")]
    RunInFlight,

    #[error("no pending confirmation with id {0}")]
    ConfirmationNotFound(String),

    #[error("confirmation {0} has expired")]
    ConfirmationExpired(String),

    #[error("session was reset while the run was in flight")]
    SessionReset,

    /// A collaborator (repository, policy) failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl From<FieldErrors> for RuntimeError {
    fn from(errors: FieldErrors) -> Self {
        RuntimeError::Validation(errors)
    }
}

impl RuntimeError {
    /// Per-field messages when this is a validation failure, including
    /// validation failures raised while compiling.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            RuntimeError::Validation(errors) => Some(errors),
            RuntimeError::HttpCompile(CompileError::Validation(errors)) => Some(errors),
            RuntimeError::SqlCompile(SqlCompileError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}
