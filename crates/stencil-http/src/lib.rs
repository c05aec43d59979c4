//! # stencil-http
//!
//! Turns an HTTP App plus caller values into an [`ExecutableHttpRequest`]
//! (`stencil_core::ExecutableHttpRequest`). The compiler never sends the
//! request; an executor does.

pub mod compiler;
pub mod error;

pub use compiler::{HttpCompileRequest, HttpCompiler, join_url};
pub use error::CompileError;
