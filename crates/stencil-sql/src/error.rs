//! Error types for SQL compilation.

use stencil_policy::FieldErrors;
use stencil_template::UnresolvedToken;
use thiserror::Error;

/// Errors that abort SQL compilation. No statement is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlCompileError {
    #[error("invalid inputs: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedToken),

    /// GUI queries need a schema snapshot to name tables and columns.
    #[error("no schema snapshot is available for this resource")]
    SchemaUnavailable,

    #[error("query has no table")]
    MissingTable,

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column '{column}' in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("invalid limit '{0}': expected a non-negative integer")]
    InvalidLimit(String),

    #[error("filter on '{column}' needs a value")]
    MissingFilterValue { column: String },

    #[error("filter on '{column}' has an empty list")]
    EmptyList { column: String },

    #[error("invalid value for '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("raw sql is empty")]
    EmptyStatement,

    /// `@name` tokens in the statement with no matching parameter.
    #[error("unbound parameter(s): {}", .0.join(", "))]
    UnboundParameter(Vec<String>),

    /// A parameter declared more than once with different values.
    #[error("parameter '{0}' is declared with conflicting values")]
    AmbiguousParameter(String),
}

impl From<FieldErrors> for SqlCompileError {
    fn from(errors: FieldErrors) -> Self {
        SqlCompileError::Validation(errors)
    }
}
