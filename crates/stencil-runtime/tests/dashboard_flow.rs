//! Dashboard sessions driven against a recording executor.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use stencil_core::{CurrentUser, KeyValue, LimitsConfig, ProjectConfig, Resource};
use stencil_policy::AllowAllPolicy;
use stencil_runtime::{
    ActionRunOutcome, AppRunner, AuditEvent, AuditEventKind, AuditSink, CompiledArtifact,
    DashboardSession, ExecutionResponse, Executor, InMemoryRepository, Phase, RuntimeError,
};

const PROJECT: &str = r#"
project: support
resources:
  - id: crm
    connection:
      http:
        baseUrl: https://crm.example.com
apps:
  - id: lookup
    resourceId: crm
    inputs:
      - id: p1
        label: email
        type: email
        required: true
    operation:
      http:
        method: GET
        urlPath: /accounts
        urlParameters:
          - key: email
            value: "{email}"
  - id: send-mail
    resourceId: crm
    inputs:
      - id: m1
        label: email
        type: email
        required: true
      - id: m2
        label: note
        type: text
      - id: m3
        label: accountId
        type: integer
    operation:
      http:
        method: POST
        urlPath: /mail
        body:
          - key: to
            value: "{email}"
          - key: note
            value: "{note}"
dashboards:
  - id: support
    prepareAppId: lookup
    loadInputs:
      - id: l-email
        label: email
        type: email
        required: true
    actionInputs:
      - id: a-note
        label: note
        type: text
        defaultValue: hello
    actions:
      - id: notify
        appId: send-mail
        label: Notify
        successMessage: Sent
        errorMessage: Could not send
      - id: refund
        appId: send-mail
        label: Refund
        confirmEnabled: true
    bindings:
      - actionId: notify
        inputName: email
        sourceType: load_input
        sourceKey: l-email
      - actionId: notify
        inputName: note
        sourceType: action_input
        sourceKey: a-note
      - actionId: notify
        inputName: accountId
        sourceType: prepare_output
        sourceKey: account.id
      - actionId: refund
        inputName: email
        sourceType: load_input
        sourceKey: l-email
  - id: simple
    loadInputs:
      - id: l1
        label: Customer email
        type: email
        required: true
    actions:
      - id: a1
        appId: send-mail
    bindings:
      - actionId: a1
        inputName: email
        sourceType: load_input
        sourceKey: l1
"#;

/// Records every artifact and answers with canned responses.
#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<CompiledArtifact>>,
    fail: AtomicBool,
}

impl RecordingExecutor {
    fn calls(&self) -> Vec<CompiledArtifact> {
        self.calls.lock().unwrap().clone()
    }

    fn last_body(&self) -> Vec<KeyValue> {
        match self.calls().last() {
            Some(CompiledArtifact::Http(request)) => request.body.clone(),
            other => panic!("expected an http call, got {:?}", other),
        }
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(
        &self,
        _resource: &Resource,
        artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse> {
        self.calls.lock().unwrap().push(artifact.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Ok(ExecutionResponse::error("upstream returned 502"));
        }
        let CompiledArtifact::Http(request) = artifact else {
            anyhow::bail!("unexpected sql artifact");
        };
        if request.base_url.ends_with("/accounts") {
            Ok(ExecutionResponse::success(r#"{"account":{"id":99}}"#))
        } else {
            Ok(ExecutionResponse::success("queued"))
        }
    }
}

/// Blocks inside `execute` until released.
#[derive(Default)]
struct BlockingExecutor {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Executor for BlockingExecutor {
    async fn execute(
        &self,
        _resource: &Resource,
        _artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ExecutionResponse::success(r#"{"account":{"id":1}}"#))
    }
}

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<AuditEventKind>>,
}

impl RecordingAudit {
    fn kinds(&self) -> Vec<AuditEventKind> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event.kind);
    }
}

struct Harness {
    executor: Arc<RecordingExecutor>,
    audit: Arc<RecordingAudit>,
    session: DashboardSession,
}

fn user() -> CurrentUser {
    CurrentUser {
        id: "agent-7".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

fn runner_with(executor: Arc<dyn Executor>, audit: Arc<dyn AuditSink>) -> (ProjectConfig, Arc<AppRunner>) {
    let config = ProjectConfig::from_yaml(PROJECT).unwrap();
    let runner = AppRunner::new(
        Arc::new(InMemoryRepository::from_config(&config)),
        executor,
        Arc::new(AllowAllPolicy),
        audit,
        LimitsConfig::default(),
    );
    (config, Arc::new(runner))
}

fn harness(dashboard_id: &str) -> Harness {
    let executor = Arc::new(RecordingExecutor::default());
    let audit = Arc::new(RecordingAudit::default());
    let (config, runner) = runner_with(executor.clone(), audit.clone());
    let dashboard = config.get_dashboard(dashboard_id).unwrap().clone();
    Harness {
        executor,
        audit,
        session: DashboardSession::new(dashboard, runner, user()),
    }
}

async fn loaded_support() -> Harness {
    let h = harness("support");
    h.session.set_load_value("l-email", "a@b.com").unwrap();
    let prepare = h.session.load().await.unwrap().unwrap();
    assert!(prepare.is_success());
    h
}

#[tokio::test]
async fn test_run_action_in_preload_is_rejected_without_side_effects() {
    let h = harness("support");

    let err = h.session.run_action("notify").await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::WrongPhase {
            expected: Phase::PostLoad,
            actual: Phase::PreLoad
        }
    ));

    let refund = h.session.run_action("refund").await.unwrap_err();
    assert!(matches!(refund, RuntimeError::WrongPhase { .. }));

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.phase, Phase::PreLoad);
    assert!(snapshot.action_results.is_empty());
    assert!(snapshot.pending_confirmation.is_none());
    assert!(h.executor.calls().is_empty());
    assert!(h.audit.kinds().is_empty());
}

#[tokio::test]
async fn test_load_without_prepare_moves_to_post_load() {
    let h = harness("simple");
    h.session.set_load_value("l1", "a@b.com").unwrap();

    assert_eq!(h.session.load().await.unwrap(), None);
    assert_eq!(h.session.phase(), Phase::PostLoad);
    assert!(h.executor.calls().is_empty());
}

#[tokio::test]
async fn test_load_input_binding_resolves_action_inputs() {
    let h = harness("simple");
    h.session.set_load_value("l1", "a@b.com").unwrap();
    h.session.load().await.unwrap();

    let inputs = h.session.resolve_action_inputs("a1").unwrap();
    let expected: BTreeMap<String, String> =
        [("email".to_string(), "a@b.com".to_string())].into();
    assert_eq!(inputs, expected);
}

#[tokio::test]
async fn test_invalid_load_inputs_stay_in_preload() {
    let h = harness("support");
    h.session.set_load_value("l-email", "not-an-email").unwrap();

    let err = h.session.load().await.unwrap_err();
    let errors = err.field_errors().expect("field errors");
    assert!(errors.get("l-email").is_some());
    assert_eq!(h.session.phase(), Phase::PreLoad);
    assert!(h.executor.calls().is_empty());
}

#[tokio::test]
async fn test_failed_prepare_stays_in_preload() {
    let h = harness("support");
    h.executor.fail.store(true, Ordering::SeqCst);
    h.session.set_load_value("l-email", "a@b.com").unwrap();

    let prepare = h.session.load().await.unwrap().unwrap();
    assert!(!prepare.is_success());
    assert_eq!(
        prepare.error_message.as_deref(),
        Some("upstream returned 502")
    );
    assert_eq!(h.session.phase(), Phase::PreLoad);
    assert_eq!(h.session.snapshot().prepare_output, None);

    h.executor.fail.store(false, Ordering::SeqCst);
    assert!(h.session.load().await.unwrap().unwrap().is_success());
    assert_eq!(h.session.phase(), Phase::PostLoad);
}

#[tokio::test]
async fn test_prepare_receives_load_values_by_label() {
    let h = loaded_support().await;

    let calls = h.executor.calls();
    let CompiledArtifact::Http(request) = &calls[0] else {
        panic!("expected an http call");
    };
    assert_eq!(request.base_url, "https://crm.example.com/accounts");
    assert_eq!(
        request.url_parameters,
        vec![KeyValue::new("email", "a@b.com")]
    );
}

#[tokio::test]
async fn test_action_uses_all_binding_sources() {
    let h = loaded_support().await;
    h.session.set_action_value("a-note", "thanks").unwrap();

    let inputs = h.session.resolve_action_inputs("notify").unwrap();
    assert_eq!(inputs.get("accountId").map(String::as_str), Some("99"));

    let outcome = h.session.run_action("notify").await.unwrap();
    let ActionRunOutcome::Completed(response) = outcome else {
        panic!("expected the action to run");
    };
    assert!(response.is_success());
    assert_eq!(response.response.as_deref(), Some("queued"));

    assert_eq!(
        h.executor.last_body(),
        vec![KeyValue::new("to", "a@b.com"), KeyValue::new("note", "thanks")]
    );

    let result = h.session.action_result("notify").unwrap();
    assert_eq!(result.user_message.as_deref(), Some("Sent"));
}

#[tokio::test]
async fn test_action_values_seeded_from_defaults() {
    let h = harness("support");
    assert_eq!(
        h.session.snapshot().action_values.get("a-note").map(String::as_str),
        Some("hello")
    );
}

#[tokio::test]
async fn test_phase_guards_on_value_edits() {
    let h = harness("support");
    assert!(matches!(
        h.session.set_action_value("a-note", "x"),
        Err(RuntimeError::WrongPhase { .. })
    ));
    assert!(matches!(
        h.session.set_load_value("nope", "x"),
        Err(RuntimeError::UnknownField(_))
    ));

    h.session.set_load_value("l-email", "a@b.com").unwrap();
    h.session.load().await.unwrap();
    assert!(matches!(
        h.session.set_load_value("l-email", "c@d.com"),
        Err(RuntimeError::WrongPhase { .. })
    ));
}

#[tokio::test]
async fn test_failed_action_keeps_prior_results() {
    let h = loaded_support().await;
    h.session.run_action("notify").await.unwrap();
    let first = h.session.action_result("notify").unwrap();
    assert!(first.is_success());

    h.executor.fail.store(true, Ordering::SeqCst);
    let ActionRunOutcome::ConfirmationRequired(pending) =
        h.session.run_action("refund").await.unwrap()
    else {
        panic!("refund requires confirmation");
    };
    let response = h.session.confirm(&pending.id).await.unwrap();
    assert!(!response.is_success());
    assert_eq!(
        response.error_message.as_deref(),
        Some("upstream returned 502")
    );

    assert_eq!(h.session.phase(), Phase::PostLoad);
    assert_eq!(h.session.action_result("notify"), Some(first));
    assert!(!h.session.action_result("refund").unwrap().is_success());
}

#[tokio::test]
async fn test_failed_action_uses_configured_error_message() {
    let h = loaded_support().await;
    h.executor.fail.store(true, Ordering::SeqCst);

    h.session.run_action("notify").await.unwrap();
    let result = h.session.action_result("notify").unwrap();
    assert_eq!(result.error_message.as_deref(), Some("upstream returned 502"));
    assert_eq!(result.user_message.as_deref(), Some("Could not send"));
}

#[tokio::test]
async fn test_confirmation_gates_execution() {
    let h = loaded_support().await;
    let calls_after_load = h.executor.calls().len();

    let ActionRunOutcome::ConfirmationRequired(pending) =
        h.session.run_action("refund").await.unwrap()
    else {
        panic!("refund requires confirmation");
    };
    assert_eq!(pending.action_id, "refund");
    assert_eq!(pending.message, "Run Refund?");
    assert_eq!(h.executor.calls().len(), calls_after_load);

    let before = h.session.snapshot().action_results;
    assert_eq!(h.session.cancel_confirmation(), Some(pending.clone()));
    assert_eq!(h.session.snapshot().action_results, before);
    assert!(matches!(
        h.session.confirm(&pending.id).await,
        Err(RuntimeError::ConfirmationNotFound(_))
    ));
    assert_eq!(h.executor.calls().len(), calls_after_load);

    let ActionRunOutcome::ConfirmationRequired(pending) =
        h.session.run_action("refund").await.unwrap()
    else {
        panic!("refund requires confirmation");
    };
    let response = h.session.confirm(&pending.id).await.unwrap();
    assert!(response.is_success());
    assert_eq!(h.executor.calls().len(), calls_after_load + 1);

    let kinds = h.audit.kinds();
    assert!(kinds.contains(&AuditEventKind::ActionConfirmationRequested));
    assert!(kinds.contains(&AuditEventKind::ActionCancelled));
    assert!(kinds.contains(&AuditEventKind::ActionConfirmed));
    assert_eq!(kinds.last(), Some(&AuditEventKind::ActionExecuted));
}

#[tokio::test]
async fn test_reset_returns_to_preload() {
    let h = loaded_support().await;
    h.session.set_action_value("a-note", "changed").unwrap();
    h.session.run_action("notify").await.unwrap();
    h.session.run_action("refund").await.unwrap();

    h.session.reset();

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.phase, Phase::PreLoad);
    assert!(snapshot.action_results.is_empty());
    assert_eq!(snapshot.prepare_output, None);
    assert_eq!(snapshot.pending_confirmation, None);
    assert_eq!(snapshot.load_values.get("l-email").map(String::as_str), Some(""));
    assert_eq!(snapshot.action_values.get("a-note").map(String::as_str), Some("hello"));
}

#[tokio::test]
async fn test_reset_discards_in_flight_result() {
    let executor = Arc::new(BlockingExecutor::default());
    let (config, runner) = runner_with(executor.clone(), Arc::new(RecordingAudit::default()));
    let session = DashboardSession::new(
        config.get_dashboard("support").unwrap().clone(),
        runner,
        user(),
    );
    session.set_load_value("l-email", "a@b.com").unwrap();

    let (load, ()) = tokio::join!(session.load(), async {
        executor.entered.notified().await;
        assert!(session.is_running());
        assert!(matches!(session.load().await, Err(RuntimeError::RunInFlight)));
        session.reset();
        executor.release.notify_one();
    });

    assert!(matches!(load, Err(RuntimeError::SessionReset)));
    assert_eq!(session.phase(), Phase::PreLoad);
    assert_eq!(session.snapshot().prepare_output, None);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_confirm_while_run_in_flight_keeps_confirmation() {
    let executor = Arc::new(BlockingExecutor::default());
    let (config, runner) = runner_with(executor.clone(), Arc::new(RecordingAudit::default()));
    let session = DashboardSession::new(
        config.get_dashboard("support").unwrap().clone(),
        runner,
        user(),
    );
    session.set_load_value("l-email", "a@b.com").unwrap();

    let (load, ()) = tokio::join!(session.load(), async {
        executor.entered.notified().await;
        executor.release.notify_one();
    });
    assert!(load.unwrap().unwrap().is_success());

    let ActionRunOutcome::ConfirmationRequired(pending) =
        session.run_action("refund").await.unwrap()
    else {
        panic!("refund requires confirmation");
    };

    let (notify, ()) = tokio::join!(session.run_action("notify"), async {
        executor.entered.notified().await;
        assert!(matches!(
            session.confirm(&pending.id).await,
            Err(RuntimeError::RunInFlight)
        ));
        assert_eq!(session.pending_confirmation(), Some(pending.clone()));
        executor.release.notify_one();
    });
    assert!(matches!(notify.unwrap(), ActionRunOutcome::Completed(_)));

    let (refund, ()) = tokio::join!(session.confirm(&pending.id), async {
        executor.entered.notified().await;
        executor.release.notify_one();
    });
    assert!(refund.unwrap().is_success());
    assert_eq!(session.pending_confirmation(), None);
    assert!(session.action_result("refund").is_some());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let a = loaded_support().await;
    let b = harness("support");

    assert_eq!(a.session.phase(), Phase::PostLoad);
    assert_eq!(b.session.phase(), Phase::PreLoad);
    assert_ne!(a.session.id(), b.session.id());
}
