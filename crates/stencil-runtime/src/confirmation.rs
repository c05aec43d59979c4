//! Confirmation gate for actions that ask before running.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use stencil_core::DashboardAction;

use crate::error::RuntimeError;

/// An action waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub id: String,
    pub action_id: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingConfirmation {
    pub fn new(action: &DashboardAction, ttl: Duration) -> Self {
        let now = Utc::now();
        let label = if action.label.is_empty() {
            action.id.as_str()
        } else {
            action.label.as_str()
        };
        Self {
            id: Uuid::new_v4().to_string(),
            action_id: action.id.clone(),
            title: action
                .confirm_title
                .clone()
                .unwrap_or_else(|| "Confirm".to_string()),
            message: action
                .confirm_message
                .clone()
                .unwrap_or_else(|| format!("Run {}?", label)),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Holds at most one pending confirmation. A newer request replaces the
/// older one.
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    ttl: Duration,
    pending: Option<PendingConfirmation>,
}

impl ConfirmationGate {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, pending: None }
    }

    pub fn request(&mut self, action: &DashboardAction) -> PendingConfirmation {
        let confirmation = PendingConfirmation::new(action, self.ttl);
        if let Some(replaced) = self.pending.replace(confirmation.clone()) {
            tracing::debug!(
                replaced = %replaced.id,
                action_id = %action.id,
                "Pending confirmation replaced"
            );
        }
        confirmation
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    /// The pending confirmation if `id` matches and it is still valid. It
    /// stays pending until taken.
    ///
    /// An expired confirmation is discarded.
    pub fn check(&mut self, id: &str) -> Result<PendingConfirmation, RuntimeError> {
        let pending = match &self.pending {
            Some(pending) if pending.id == id => pending.clone(),
            _ => return Err(RuntimeError::ConfirmationNotFound(id.to_string())),
        };
        if pending.is_expired() {
            self.pending = None;
            return Err(RuntimeError::ConfirmationExpired(pending.id));
        }
        Ok(pending)
    }

    /// Consume the pending confirmation if `id` matches and it is still valid.
    pub fn take(&mut self, id: &str) -> Result<PendingConfirmation, RuntimeError> {
        let pending = self.check(id)?;
        self.pending = None;
        Ok(pending)
    }

    pub fn cancel(&mut self) -> Option<PendingConfirmation> {
        self.pending.take()
    }
}
