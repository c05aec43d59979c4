//! Stencil input policy.
//!
//! Two concerns live here:
//!
//! - **Field validation**: typed validation of raw input strings against
//!   [`InputField`](stencil_core::InputField) definitions ([`validator`]).
//! - **Run permission**: the boolean capability gate consulted before any
//!   App executes ([`RunPolicy`]). Permission storage lives outside the
//!   engine; this crate only defines the seam.

pub mod error;
pub mod validator;
pub mod value;

use async_trait::async_trait;
use std::collections::HashSet;

use stencil_core::{AppDefinition, CurrentUser};

pub use error::{FieldErrors, ValidationError, ValidationErrorKind};
pub use validator::{FieldValidator, ValidatedField, ValidatedFields, validate};
pub use value::TypedValue;

/// Decides whether a caller may run an App.
#[async_trait]
pub trait RunPolicy: Send + Sync {
    async fn can_run(&self, user: &CurrentUser, app: &AppDefinition) -> anyhow::Result<bool>;
}

/// Allows every run.
pub struct AllowAllPolicy;

#[async_trait]
impl RunPolicy for AllowAllPolicy {
    async fn can_run(&self, _user: &CurrentUser, _app: &AppDefinition) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Allows only a fixed set of App ids.
pub struct AppAllowList {
    allowed: HashSet<String>,
}

impl AppAllowList {
    pub fn new(app_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: app_ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RunPolicy for AppAllowList {
    async fn can_run(&self, user: &CurrentUser, app: &AppDefinition) -> anyhow::Result<bool> {
        let allowed = self.allowed.contains(&app.id);
        if !allowed {
            tracing::debug!(user = %user.id, app = %app.id, "App not in allow list");
        }
        Ok(allowed)
    }
}
