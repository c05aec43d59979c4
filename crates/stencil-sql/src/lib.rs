//! # stencil-sql
//!
//! Compiles SQL Apps into parameterized statements.
//!
//! Identifiers come only from a [`DatabaseSchema`] snapshot and every
//! run-time value is bound as a parameter, so user input never alters the
//! statement text.

pub mod compiler;
pub mod error;
pub mod scanner;
pub mod schema;

pub use compiler::{BoundParameter, CompiledStatement, SqlCompileRequest, SqlCompiler};
pub use error::SqlCompileError;
pub use scanner::{ScannedSql, scan};
pub use schema::{ColumnKind, ColumnSchema, DatabaseSchema, TableSchema, quote_ident};
