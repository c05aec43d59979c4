//! Dashboard run sessions.
//!
//! A session walks a dashboard through two phases:
//!
//! ```text
//!   PreLoad --load()--> PostLoad --run_action()--> PostLoad
//!      ^                                              |
//!      +------------------- reset() ------------------+
//! ```
//!
//! Load values are editable only before loading, action values only after.
//! Actions never run while in `PreLoad`. At most one run is in flight per
//! session; independent sessions share nothing.

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stencil_core::{
    CurrentUser, DashboardAction, DashboardActionResponse, DashboardConfig, DashboardDefinition,
    DashboardPrepareResponse, InputField,
};
use stencil_policy::{FieldErrors, FieldValidator};

use crate::audit::{AuditEvent, AuditEventKind};
use crate::bindings::{BindingContext, resolve_bindings};
use crate::confirmation::{ConfirmationGate, PendingConfirmation};
use crate::error::RuntimeError;
use crate::runner::{AppExecution, AppRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreLoad,
    PostLoad,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreLoad => write!(f, "PreLoad"),
            Phase::PostLoad => write!(f, "PostLoad"),
        }
    }
}

/// Recorded outcome of one action run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_run_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Executor message, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The action's configured success or error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

impl ActionResult {
    fn from_execution(action: &DashboardAction, execution: AppExecution) -> Self {
        let user_message = if execution.response.is_success() {
            action.success_message.clone()
        } else {
            action.error_message.clone()
        };
        Self {
            action_run_id: execution.run_id,
            status: execution.response.status,
            response: execution.response.response,
            error_message: execution.response.error_message,
            user_message,
        }
    }

    pub fn is_success(&self) -> bool {
        stencil_core::is_success_status(Some(&self.status))
    }

    pub fn to_response(&self) -> DashboardActionResponse {
        DashboardActionResponse {
            action_run_id: self.action_run_id.clone(),
            status: self.status.clone(),
            response: self.response.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// What happened when an action was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRunOutcome {
    Completed(DashboardActionResponse),
    /// The action waits for [`DashboardSession::confirm`].
    ConfirmationRequired(PendingConfirmation),
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub dashboard_id: String,
    pub phase: Phase,
    pub load_values: BTreeMap<String, String>,
    pub action_values: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare_output: Option<Value>,
    pub action_results: BTreeMap<String, ActionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<PendingConfirmation>,
    pub running: bool,
}

struct SessionState {
    phase: Phase,
    load_values: BTreeMap<String, String>,
    action_values: BTreeMap<String, String>,
    prepare_output: Option<Value>,
    action_results: BTreeMap<String, ActionResult>,
    confirmation: ConfirmationGate,
    /// Bumped on reset; results of runs started in an older epoch are dropped.
    epoch: u64,
}

impl SessionState {
    fn seeded(config: &DashboardConfig, ttl: Duration, epoch: u64) -> Self {
        Self {
            phase: Phase::PreLoad,
            load_values: defaults(&config.load_inputs),
            action_values: defaults(&config.action_inputs),
            prepare_output: None,
            action_results: BTreeMap::new(),
            confirmation: ConfirmationGate::new(ttl),
            epoch,
        }
    }
}

fn defaults(fields: &[InputField]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|f| (f.id.clone(), f.initial_value()))
        .collect()
}

fn expect_phase(actual: Phase, expected: Phase) -> Result<(), RuntimeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(RuntimeError::WrongPhase { expected, actual })
    }
}

/// Parse a prepare response as JSON, keeping non-JSON text as a string.
fn capture_output(response: &str) -> Value {
    serde_json::from_str(response).unwrap_or_else(|_| Value::String(response.to_string()))
}

/// Holds the session's running flag until dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RuntimeError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RuntimeError::RunInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One user's run of one dashboard.
pub struct DashboardSession {
    id: String,
    dashboard: DashboardDefinition,
    runner: Arc<AppRunner>,
    user: CurrentUser,
    validator: FieldValidator,
    confirmation_ttl: Duration,
    state: Mutex<SessionState>,
    running: AtomicBool,
}

impl DashboardSession {
    pub fn new(mut dashboard: DashboardDefinition, runner: Arc<AppRunner>, user: CurrentUser) -> Self {
        dashboard.config.normalize();

        for binding in &dashboard.config.bindings {
            if dashboard.config.action(&binding.action_id).is_none() {
                tracing::warn!(
                    dashboard_id = %dashboard.id,
                    action_id = %binding.action_id,
                    input = %binding.input_name,
                    "Binding references an unknown action and will be ignored"
                );
            }
        }

        let ttl_secs = i64::try_from(runner.limits().confirmation_ttl_secs).unwrap_or(i64::MAX);
        let confirmation_ttl =
            Duration::try_seconds(ttl_secs).unwrap_or_else(|| Duration::days(365));
        let state = SessionState::seeded(&dashboard.config, confirmation_ttl, 0);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dashboard,
            runner,
            user,
            validator: FieldValidator::new(),
            confirmation_ttl,
            state: Mutex::new(state),
            running: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dashboard(&self) -> &DashboardDefinition {
        &self.dashboard
    }

    fn config(&self) -> &DashboardConfig {
        &self.dashboard.config
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn audit(&self, kind: AuditEventKind) -> AuditEvent {
        AuditEvent::new(kind, &self.user.id).session(&self.id)
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            session_id: self.id.clone(),
            dashboard_id: self.dashboard.id.clone(),
            phase: state.phase,
            load_values: state.load_values.clone(),
            action_values: state.action_values.clone(),
            prepare_output: state.prepare_output.clone(),
            action_results: state.action_results.clone(),
            pending_confirmation: state.confirmation.pending().cloned(),
            running: self.is_running(),
        }
    }

    pub fn action_result(&self, action_id: &str) -> Option<ActionResult> {
        self.state().action_results.get(action_id).cloned()
    }

    /// Set a load input by field id. Only allowed before loading.
    pub fn set_load_value(
        &self,
        field_id: &str,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let mut state = self.state();
        expect_phase(state.phase, Phase::PreLoad)?;
        if !self.config().load_inputs.iter().any(|f| f.id == field_id) {
            return Err(RuntimeError::UnknownField(field_id.to_string()));
        }
        state.load_values.insert(field_id.to_string(), value.into());
        Ok(())
    }

    /// Set an action input by field id. Only allowed after loading.
    pub fn set_action_value(
        &self,
        field_id: &str,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let mut state = self.state();
        expect_phase(state.phase, Phase::PostLoad)?;
        if !self.config().action_inputs.iter().any(|f| f.id == field_id) {
            return Err(RuntimeError::UnknownField(field_id.to_string()));
        }
        state.action_values.insert(field_id.to_string(), value.into());
        Ok(())
    }

    /// Validate load inputs and run the prepare App, if any.
    ///
    /// Returns `None` when the dashboard has no prepare App. The session
    /// moves to `PostLoad` only if validation passes and the prepare run
    /// reports success.
    pub async fn load(&self) -> Result<Option<DashboardPrepareResponse>, RuntimeError> {
        let _guard = RunGuard::acquire(&self.running)?;

        let (prepare_app_id, values, epoch) = {
            let mut state = self.state();
            expect_phase(state.phase, Phase::PreLoad)?;
            let validated = self
                .validator
                .validate_by_id(&self.config().load_inputs, &state.load_values)?;

            let Some(prepare_app_id) = self.config().prepare_app_id.clone() else {
                state.phase = Phase::PostLoad;
                tracing::debug!(session = %self.id, "Loaded without prepare app");
                return Ok(None);
            };
            (prepare_app_id, validated.rendered_by_label(), state.epoch)
        };

        let execution = self
            .runner
            .execute(&prepare_app_id, &values, &self.user, None)
            .await?;

        self.runner.audit().record(
            self.audit(AuditEventKind::PrepareExecuted)
                .app(&prepare_app_id)
                .run(&execution.run_id, &execution.response.status),
        );

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::info!(session = %self.id, run_id = %execution.run_id, "Discarding prepare result after reset");
            return Err(RuntimeError::SessionReset);
        }

        let succeeded = execution.response.is_success();
        if succeeded {
            state.prepare_output = execution.response.response.as_deref().map(capture_output);
            state.phase = Phase::PostLoad;
            tracing::debug!(session = %self.id, "Prepare succeeded");
        } else {
            tracing::warn!(session = %self.id, status = %execution.response.status, "Prepare failed; staying in PreLoad");
        }

        Ok(Some(DashboardPrepareResponse {
            prepare_run_id: execution.run_id,
            status: execution.response.status,
            response: execution.response.response,
            error_message: execution.response.error_message,
        }))
    }

    /// Run an action, or open a confirmation if the action asks for one.
    pub async fn run_action(&self, action_id: &str) -> Result<ActionRunOutcome, RuntimeError> {
        let action = {
            let mut state = self.state();
            expect_phase(state.phase, Phase::PostLoad)?;
            let action = self
                .config()
                .action(action_id)
                .ok_or_else(|| RuntimeError::UnknownAction(action_id.to_string()))?
                .clone();

            if action.confirm_enabled {
                let pending = state.confirmation.request(&action);
                drop(state);
                self.runner.audit().record(
                    self.audit(AuditEventKind::ActionConfirmationRequested)
                        .action(&action.id)
                        .app(&action.app_id),
                );
                return Ok(ActionRunOutcome::ConfirmationRequired(pending));
            }
            action
        };

        self.execute_action(&action)
            .await
            .map(ActionRunOutcome::Completed)
    }

    /// Acknowledge a pending confirmation and run its action.
    ///
    /// The confirmation is consumed only once the action is ready to
    /// dispatch. If another run is in flight or the inputs do not resolve,
    /// it stays pending and can be confirmed again.
    pub async fn confirm(
        &self,
        confirmation_id: &str,
    ) -> Result<DashboardActionResponse, RuntimeError> {
        let guard = RunGuard::acquire(&self.running)?;

        let (action, inputs, epoch) = {
            let mut state = self.state();
            expect_phase(state.phase, Phase::PostLoad)?;
            let pending = state.confirmation.check(confirmation_id)?;
            let action = self
                .config()
                .action(&pending.action_id)
                .ok_or_else(|| RuntimeError::UnknownAction(pending.action_id.clone()))?
                .clone();
            let inputs = self.bound_inputs(&state, &action.id)?;
            state.confirmation.take(confirmation_id)?;
            (action, inputs, state.epoch)
        };

        self.runner.audit().record(
            self.audit(AuditEventKind::ActionConfirmed)
                .action(&action.id)
                .app(&action.app_id),
        );

        self.dispatch(guard, &action, inputs, epoch).await
    }

    /// Drop the pending confirmation. Recorded results are untouched.
    pub fn cancel_confirmation(&self) -> Option<PendingConfirmation> {
        let cancelled = self.state().confirmation.cancel();
        if let Some(pending) = &cancelled {
            self.runner
                .audit()
                .record(self.audit(AuditEventKind::ActionCancelled).action(&pending.action_id));
        }
        cancelled
    }

    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.state().confirmation.pending().cloned()
    }

    /// Return to `PreLoad` with default values and no results.
    ///
    /// A run already handed to the executor is not aborted; its result is
    /// discarded when it arrives.
    pub fn reset(&self) {
        {
            let mut state = self.state();
            let epoch = state.epoch + 1;
            *state = SessionState::seeded(self.config(), self.confirmation_ttl, epoch);
        }
        self.runner
            .audit()
            .record(self.audit(AuditEventKind::SessionReset));
        tracing::debug!(session = %self.id, "Session reset");
    }

    /// The input map an action's App would receive right now.
    pub fn resolve_action_inputs(
        &self,
        action_id: &str,
    ) -> Result<BTreeMap<String, String>, RuntimeError> {
        let state = self.state();
        expect_phase(state.phase, Phase::PostLoad)?;
        if self.config().action(action_id).is_none() {
            return Err(RuntimeError::UnknownAction(action_id.to_string()));
        }
        self.bound_inputs(&state, action_id)
    }

    fn bound_inputs(
        &self,
        state: &SessionState,
        action_id: &str,
    ) -> Result<BTreeMap<String, String>, RuntimeError> {
        let config = self.config();
        let load = self
            .validator
            .validate_by_id(&config.load_inputs, &state.load_values);
        let action = self
            .validator
            .validate_by_id(&config.action_inputs, &state.action_values);

        let (load, action) = match (load, action) {
            (Ok(load), Ok(action)) => (load, action),
            (load, action) => {
                let mut errors = FieldErrors::new();
                if let Err(e) = load {
                    errors.extend(e);
                }
                if let Err(e) = action {
                    errors.extend(e);
                }
                return Err(RuntimeError::Validation(errors));
            }
        };

        let inputs = resolve_bindings(
            config,
            action_id,
            &BindingContext {
                load: &load,
                action: &action,
                prepare_output: state.prepare_output.as_ref(),
                current_user: &self.user,
            },
        )?;
        Ok(inputs)
    }

    async fn execute_action(
        &self,
        action: &DashboardAction,
    ) -> Result<DashboardActionResponse, RuntimeError> {
        let guard = RunGuard::acquire(&self.running)?;

        let (inputs, epoch) = {
            let state = self.state();
            expect_phase(state.phase, Phase::PostLoad)?;
            (self.bound_inputs(&state, &action.id)?, state.epoch)
        };

        self.dispatch(guard, action, inputs, epoch).await
    }

    /// Run the action's App and record the result. The guard is held until
    /// the result is recorded.
    async fn dispatch(
        &self,
        _guard: RunGuard<'_>,
        action: &DashboardAction,
        inputs: BTreeMap<String, String>,
        epoch: u64,
    ) -> Result<DashboardActionResponse, RuntimeError> {
        let execution = self
            .runner
            .execute(&action.app_id, &inputs, &self.user, None)
            .await?;
        let result = ActionResult::from_execution(action, execution);

        self.runner.audit().record(
            self.audit(AuditEventKind::ActionExecuted)
                .action(&action.id)
                .app(&action.app_id)
                .run(&result.action_run_id, &result.status),
        );

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::info!(
                session = %self.id,
                action_id = %action.id,
                run_id = %result.action_run_id,
                "Discarding action result after reset"
            );
            return Err(RuntimeError::SessionReset);
        }
        state
            .action_results
            .insert(action.id.clone(), result.clone());

        Ok(result.to_response())
    }
}
