//! Core library for the Stagehand staging deployment toolkit.
//!
//! The crate models a staging web-application stack as explicit values
//! (network topology, database, autoscaled fleet, load balancer, permission
//! graph, bootstrap script) and composes them against a cloud provider
//! through the [`provider::Provider`] seam (plan → validate → create →
//! wire → attach).

pub mod artifact;
pub mod balancer;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod fleet;
pub mod network;
pub mod permissions;
pub mod provider;
pub mod schedule;
pub mod secrets;
pub mod stack;

pub use artifact::{ArtifactError, ArtifactHandle, ArtifactSource, ResolvedArtifact};
pub use balancer::{BalancerSpec, BalancerSpecError};
pub use bootstrap::{
    BootPhase, BootstrapError, BootstrapParams, BootstrapScript, BootstrapScriptGenerator,
    DatabaseBootstrap, ScriptParam,
};
pub use config::{ConfigError, StackConfig};
pub use database::{DatabaseEndpoint, DatabaseSpec, DatabaseSpecError, RemovalPolicy};
pub use fleet::{FleetSpec, FleetSpecError, HealthCheckSource};
pub use network::{NetworkPlan, NetworkPlanError, SubnetPlan, TierKind, TierSpec};
pub use permissions::{
    Capability, Identity, PermissionEdge, PermissionError, PermissionGraph,
    PermissionGraphBuilder,
};
pub use provider::{
    ArtifactStore, BalancerHandle, DatabaseHandle, FleetHandle, NetworkHandle, Provider,
    ProviderFuture,
};
pub use schedule::{FleetSchedule, ScheduleEntry, ScheduleError};
pub use secrets::{
    Credential, CredentialRequest, SecretError, SecretFieldLookup, SecretId, SecretPayload,
};
pub use stack::{
    DatabasePlan, SpecValidationError, StackComposer, StackError, StackOutputs, StackSpec,
};
