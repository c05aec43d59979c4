//! Run events.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    AppExecuted,
    PrepareExecuted,
    ActionExecuted,
    ActionConfirmationRequested,
    ActionConfirmed,
    ActionCancelled,
    SessionReset,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::AppExecuted => "app_executed",
            AuditEventKind::PrepareExecuted => "prepare_executed",
            AuditEventKind::ActionExecuted => "action_executed",
            AuditEventKind::ActionConfirmationRequested => "action_confirmation_requested",
            AuditEventKind::ActionConfirmed => "action_confirmed",
            AuditEventKind::ActionCancelled => "action_cancelled",
            AuditEventKind::SessionReset => "session_reset",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, user_id: impl Into<String>) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
            session_id: None,
            app_id: None,
            action_id: None,
            run_id: None,
            status: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn app(mut self, id: impl Into<String>) -> Self {
        self.app_id = Some(id.into());
        self
    }

    pub fn action(mut self, id: impl Into<String>) -> Self {
        self.action_id = Some(id.into());
        self
    }

    pub fn run(mut self, run_id: impl Into<String>, status: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self.status = Some(status.into());
        self
    }
}

/// Trait boundary for run events. Recording must not fail the run.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits events as structured `tracing` records.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "stencil::audit",
            event = event.kind.as_str(),
            user = %event.user_id,
            session = event.session_id.as_deref().unwrap_or("-"),
            app = event.app_id.as_deref().unwrap_or("-"),
            action = event.action_id.as_deref().unwrap_or("-"),
            run = event.run_id.as_deref().unwrap_or("-"),
            status = event.status.as_deref().unwrap_or("-"),
            "audit"
        );
    }
}
