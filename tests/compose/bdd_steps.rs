//! BDD step definitions for the stack composition workflow.

use rstest_bdd_macros::{given, then, when};
use stagehand::schedule::{FleetSchedule, ScheduleEntry};
use stagehand::stack::{StackComposer, StackError};
use tokio::runtime::Runtime;

use super::test_doubles::RecordingProviderError;
use super::test_helpers::{ComposeContext, ComposeFailure, ComposeFailureKind, ComposeResult};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a full staging stack specification")]
fn full_specification(compose_context: ComposeContext) -> ComposeContext {
    compose_context
}

#[given("the database step is disabled")]
fn database_disabled(mut compose_context: ComposeContext) -> ComposeContext {
    compose_context.spec.database = None;
    compose_context
}

#[given("the load balancer step is disabled")]
fn balancer_disabled(mut compose_context: ComposeContext) -> ComposeContext {
    compose_context.spec.balancer = None;
    compose_context
}

#[given("the application host is \"{host}\"")]
fn explicit_app_host(mut compose_context: ComposeContext, host: String) -> ComposeContext {
    compose_context.spec.app_host_override = Some(host);
    compose_context
}

#[given("the schedule requests more capacity than the fleet ceiling")]
fn schedule_exceeds_ceiling(mut compose_context: ComposeContext) -> ComposeContext {
    let entry = ScheduleEntry::at(8, 30, 5)
        .unwrap_or_else(|err| panic!("schedule entry should build: {err}"));
    let schedule = FleetSchedule::new("Asia/Tokyo", vec![entry])
        .unwrap_or_else(|err| panic!("schedule should build: {err}"));
    compose_context.spec.fleet = compose_context.spec.fleet.clone().schedule(schedule);
    compose_context
}

#[given("network creation fails")]
fn network_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_network();
    compose_context
}

#[given("credential generation fails")]
fn credential_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_credential();
    compose_context
}

#[given("fleet creation fails")]
fn fleet_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_fleet();
    compose_context
}

#[given("balancer creation fails")]
fn balancer_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_balancer();
    compose_context
}

#[given("bootstrap attachment fails")]
fn attach_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_attach();
    compose_context
}

#[given("database creation fails")]
fn database_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_database();
    compose_context
}

#[given("artifact publication fails")]
fn publish_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_publish();
    compose_context
}

#[given("permission application fails")]
fn permission_fails(compose_context: ComposeContext) -> ComposeContext {
    compose_context.provider.fail_permission();
    compose_context
}

#[when("I compose the stack")]
fn compose_stack(compose_context: ComposeContext) -> Result<ComposeContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let ComposeContext { provider, spec, .. } = compose_context;

    let composer = StackComposer::new(provider.clone(), provider.clone());
    let spec_clone = spec.clone();
    let result = runtime.block_on(async move { composer.compose(&spec_clone).await });
    let outcome = match result {
        Ok(outputs) => ComposeResult::Success(Box::new(outputs)),
        Err(err) => ComposeResult::Failure(ComposeFailure {
            kind: map_failure_kind(&err),
            message: err.to_string(),
        }),
    };

    Ok(ComposeContext {
        provider,
        spec,
        outcome: Some(outcome),
    })
}

#[then("the composition succeeds")]
fn composition_succeeds(compose_context: &ComposeContext) -> Result<(), StepError> {
    match &compose_context.outcome {
        Some(ComposeResult::Success(_)) => Ok(()),
        Some(ComposeResult::Failure(failure)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {}",
            failure.message
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the application URL is \"{url}\"")]
fn application_url(compose_context: &ComposeContext, url: String) -> Result<(), StepError> {
    let outputs = success_outputs(compose_context)?;
    if outputs.application_url == url {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected application URL {url}, got {}",
            outputs.application_url
        )))
    }
}

#[then("both artifacts are published")]
fn artifacts_published(compose_context: &ComposeContext) -> Result<(), StepError> {
    let keys = compose_context.provider.published_keys();
    let expected = [
        String::from("assets/atte-1.3.2.zip"),
        String::from("assets/nginx.conf"),
    ];
    if keys == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected published keys {expected:?}, got {keys:?}"
        )))
    }
}

#[then("permission edges are applied before the bootstrap script is attached")]
fn edges_before_attach(compose_context: &ComposeContext) -> Result<(), StepError> {
    let calls = compose_context.provider.calls();
    let last_edge = calls
        .iter()
        .rposition(|call| call == "apply_permission")
        .ok_or_else(|| StepError::Assertion(String::from("no permission edges applied")))?;
    let attach = calls
        .iter()
        .position(|call| call == "attach_bootstrap")
        .ok_or_else(|| StepError::Assertion(String::from("bootstrap never attached")))?;
    if last_edge < attach {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "bootstrap attached before permissions were complete: {calls:?}"
        )))
    }
}

#[then("the bootstrap script is attached once")]
fn script_attached_once(compose_context: &ComposeContext) -> Result<(), StepError> {
    let scripts = compose_context.provider.attached_scripts();
    if scripts.len() == 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected one attached script, got {}",
            scripts.len()
        )))
    }
}

#[then("the bootstrap script defers the database secret to boot time")]
fn script_defers_secret(compose_context: &ComposeContext) -> Result<(), StepError> {
    let scripts = compose_context.provider.attached_scripts();
    let script = scripts
        .first()
        .ok_or_else(|| StepError::Assertion(String::from("no script attached")))?;
    let text = script.shell();
    if text.contains("$(aws secretsmanager get-secret-value --secret-id staging/db-secret") {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "script should fetch the secret at boot time",
        )))
    }
}

#[then("no credential is generated")]
fn no_credential(compose_context: &ComposeContext) -> Result<(), StepError> {
    if compose_context.provider.credential_requests() == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "credential should not be generated",
        )))
    }
}

#[then("the composition fails with kind \"{kind}\"")]
fn composition_fails(compose_context: &ComposeContext, kind: String) -> Result<(), StepError> {
    let expected = parse_failure_kind(&kind)?;
    let Some(ComposeResult::Failure(failure)) = &compose_context.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    if failure.kind == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {expected:?}, got {:?}: {}",
            failure.kind, failure.message
        )))
    }
}

#[then("no provider call is made")]
fn no_provider_calls(compose_context: &ComposeContext) -> Result<(), StepError> {
    let calls = compose_context.provider.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no provider calls, got {calls:?}"
        )))
    }
}

#[then("no fleet is created")]
fn no_fleet(compose_context: &ComposeContext) -> Result<(), StepError> {
    let calls = compose_context.provider.calls();
    if calls.iter().any(|call| call == "create_fleet") {
        Err(StepError::Assertion(String::from(
            "fleet should not be created",
        )))
    } else {
        Ok(())
    }
}

#[then("no bootstrap script is attached")]
fn nothing_attached(compose_context: &ComposeContext) -> Result<(), StepError> {
    if compose_context.provider.attached_scripts().is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "bootstrap should not be attached",
        )))
    }
}

fn success_outputs(
    compose_context: &ComposeContext,
) -> Result<&stagehand::stack::StackOutputs, StepError> {
    match &compose_context.outcome {
        Some(ComposeResult::Success(outputs)) => Ok(outputs),
        Some(ComposeResult::Failure(failure)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {}",
            failure.message
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

fn map_failure_kind(
    err: &StackError<RecordingProviderError, RecordingProviderError>,
) -> ComposeFailureKind {
    match err {
        StackError::Validation(_) => ComposeFailureKind::Validation,
        StackError::Artifact(_) => ComposeFailureKind::Artifact,
        StackError::Publish { .. } => ComposeFailureKind::Publish,
        StackError::Network(_) => ComposeFailureKind::Network,
        StackError::Credential(_) => ComposeFailureKind::Credential,
        StackError::Database(_) => ComposeFailureKind::Database,
        StackError::Fleet(_) => ComposeFailureKind::Fleet,
        StackError::Balancer(_) => ComposeFailureKind::Balancer,
        StackError::Permission { .. } => ComposeFailureKind::Permission,
        StackError::Bootstrap(_) => ComposeFailureKind::Bootstrap,
        StackError::Attach(_) => ComposeFailureKind::Attach,
    }
}

fn parse_failure_kind(kind: &str) -> Result<ComposeFailureKind, StepError> {
    match kind {
        "validation" => Ok(ComposeFailureKind::Validation),
        "artifact" => Ok(ComposeFailureKind::Artifact),
        "publish" => Ok(ComposeFailureKind::Publish),
        "network" => Ok(ComposeFailureKind::Network),
        "credential" => Ok(ComposeFailureKind::Credential),
        "database" => Ok(ComposeFailureKind::Database),
        "fleet" => Ok(ComposeFailureKind::Fleet),
        "balancer" => Ok(ComposeFailureKind::Balancer),
        "permission" => Ok(ComposeFailureKind::Permission),
        "bootstrap" => Ok(ComposeFailureKind::Bootstrap),
        "attach" => Ok(ComposeFailureKind::Attach),
        _ => Err(StepError::Assertion(format!(
            "unknown failure kind: {kind}"
        ))),
    }
}
