//! # stencil-template
//!
//! Placeholder resolution for Stencil templates.
//!
//! Templates such as `/users/{userId}` or `Bearer {current_user.id}` are
//! resolved against a [`PlaceholderValues`] map supplied by the caller:
//!
//! ```
//! use stencil_template::{PlaceholderValues, resolve};
//!
//! let mut values = PlaceholderValues::new();
//! values.insert("userId", "42");
//!
//! assert_eq!(resolve("/users/{userId}", &values).unwrap(), "/users/42");
//! assert!(resolve("/users/{missing}", &values).is_err());
//! ```
//!
//! The `current_user.*` namespace is injected explicitly with
//! [`PlaceholderValues::with_current_user`]; nothing is read from ambient
//! state.

pub mod error;
pub mod resolver;
pub mod template;

pub use error::UnresolvedToken;
pub use resolver::BatchResolver;
pub use template::{PlaceholderValues, Segment, Template, resolve};
