//! Shared fixtures for stack composition BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use stagehand::artifact::ArtifactSource;
use stagehand::balancer::BalancerSpec;
use stagehand::config::default_schedule;
use stagehand::database::DatabaseSpec;
use stagehand::fleet::FleetSpec;
use stagehand::network::{NetworkPlan, TierKind, TierSpec};
use stagehand::secrets::CredentialRequest;
use stagehand::stack::{DatabasePlan, StackOutputs, StackSpec};
use thiserror::Error;

use super::test_doubles::RecordingProvider;

#[derive(Clone, Debug)]
pub struct ComposeContext {
    pub provider: RecordingProvider,
    pub spec: StackSpec,
    pub outcome: Option<ComposeResult>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ComposeFailureKind {
    Validation,
    Artifact,
    Publish,
    Network,
    Credential,
    Database,
    Fleet,
    Balancer,
    Permission,
    Bootstrap,
    Attach,
}

#[derive(Clone, Debug)]
pub struct ComposeFailure {
    pub kind: ComposeFailureKind,
    pub message: String,
}

#[derive(Clone, Debug)]
pub enum ComposeResult {
    Success(Box<StackOutputs>),
    Failure(ComposeFailure),
}

#[derive(Clone, Debug, Error)]
pub enum ComposeTestError {
    #[error("invalid compose fixture: {0}")]
    Fixture(String),
}

pub type ComposeContextResult = Result<ComposeContext, ComposeTestError>;

#[fixture]
pub fn compose_context_result() -> ComposeContextResult {
    build_compose_context()
}

#[fixture]
pub fn compose_context(compose_context_result: ComposeContextResult) -> ComposeContext {
    compose_context_result
        .unwrap_or_else(|err| panic!("compose context fixture should initialise: {err}"))
}

fn build_compose_context() -> ComposeContextResult {
    let cidr = "10.0.0.0/16"
        .parse()
        .map_err(|err| ComposeTestError::Fixture(format!("network cidr: {err}")))?;
    let tiers = [
        TierSpec::new("Public", TierKind::Public, 24),
        TierSpec::new("Private", TierKind::PrivateWithEgress, 24),
    ];
    let network = NetworkPlan::new(cidr, 2, &tiers)
        .map_err(|err| ComposeTestError::Fixture(format!("network plan: {err}")))?
        .with_service_gateway("object-storage");

    let schedule = default_schedule("Asia/Tokyo")
        .map_err(|err| ComposeTestError::Fixture(format!("schedule: {err}")))?;
    let fleet = FleetSpec::new("t2.micro", 0, 2)
        .balancer_health(Duration::from_secs(300))
        .schedule(schedule);

    let credential = CredentialRequest::new("admin")
        .map_err(|err| ComposeTestError::Fixture(format!("credential: {err}")))?;

    let spec = StackSpec {
        app_name: String::from("atte"),
        app_version: String::from("1.3.2"),
        region: String::from("ap-northeast-1"),
        app_env: String::from("staging"),
        network,
        archive: ArtifactSource::Inline(String::from("zip-bytes")),
        web_server_config: ArtifactSource::Inline(String::from("worker_processes auto;\n")),
        database: Some(DatabasePlan {
            spec: DatabaseSpec::new("mysql-8.0", "atte", 3306),
            credential,
        }),
        fleet,
        balancer: Some(BalancerSpec::new(80, 80, "/login").stickiness(Duration::from_secs(86_400))),
        app_host_override: None,
    };

    Ok(ComposeContext {
        provider: RecordingProvider::new(),
        spec,
        outcome: None,
    })
}
