//! Narrow interfaces to the cloud collaborators.
//!
//! Resource provisioning itself is out of scope: the underlying services
//! are opaque, exposing identifiers, endpoints, and connectivity handles
//! through the [`Provider`] and [`ArtifactStore`] traits. The composition
//! logic in [`crate::stack`] is written entirely against these seams.

use std::future::Future;
use std::pin::Pin;

use crate::artifact::{ArtifactHandle, ResolvedArtifact};
use crate::balancer::BalancerSpec;
use crate::bootstrap::BootstrapScript;
use crate::database::{DatabaseEndpoint, DatabaseSpec};
use crate::fleet::FleetSpec;
use crate::network::NetworkPlan;
use crate::permissions::{Identity, PermissionEdge};
use crate::secrets::{Credential, CredentialRequest};

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Handle returned once a network has been created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkHandle {
    /// Provider-specific network identifier.
    pub id: String,
    /// Subnet identifiers in the public tier.
    pub public_subnet_ids: Vec<String>,
    /// Subnet identifiers in the private tier.
    pub private_subnet_ids: Vec<String>,
}

/// Handle returned once a database has been created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseHandle {
    /// Provider-specific database identifier.
    pub id: String,
    /// Resolved connection endpoint.
    pub endpoint: DatabaseEndpoint,
}

/// Handle returned once a compute fleet has been created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FleetHandle {
    /// Provider-specific fleet identifier.
    pub id: String,
    /// Identity fleet instances assume, the grantee of permission edges.
    pub identity: Identity,
}

/// Handle returned once a load balancer has been created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalancerHandle {
    /// Provider-specific balancer identifier.
    pub id: String,
    /// Public hostname, stable for the life of the balancer.
    pub dns_name: String,
}

/// Minimal interface implemented by cloud providers.
///
/// The composer calls these sequentially, top-to-bottom; the provider may
/// parallelise the underlying resource creation however it likes.
pub trait Provider {
    /// Provider-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Realises a network plan.
    fn create_network<'a>(
        &'a self,
        plan: &'a NetworkPlan,
    ) -> ProviderFuture<'a, NetworkHandle, Self::Error>;

    /// Generates and stores a credential, exactly once per database.
    fn generate_credential<'a>(
        &'a self,
        request: &'a CredentialRequest,
    ) -> ProviderFuture<'a, Credential, Self::Error>;

    /// Creates a managed database in the network's private tier.
    fn create_database<'a>(
        &'a self,
        network: &'a NetworkHandle,
        spec: &'a DatabaseSpec,
        credential: &'a Credential,
    ) -> ProviderFuture<'a, DatabaseHandle, Self::Error>;

    /// Creates an autoscaled fleet in the network's public tier, including
    /// the spec's schedule triggers when present.
    fn create_fleet<'a>(
        &'a self,
        network: &'a NetworkHandle,
        spec: &'a FleetSpec,
    ) -> ProviderFuture<'a, FleetHandle, Self::Error>;

    /// Creates a public load balancer forwarding to the fleet.
    fn create_balancer<'a>(
        &'a self,
        network: &'a NetworkHandle,
        fleet: &'a FleetHandle,
        spec: &'a BalancerSpec,
    ) -> ProviderFuture<'a, BalancerHandle, Self::Error>;

    /// Applies one permission edge. Must be idempotent.
    fn apply_permission<'a>(
        &'a self,
        edge: &'a PermissionEdge,
    ) -> ProviderFuture<'a, (), Self::Error>;

    /// Attaches the boot script to the fleet's launch configuration.
    fn attach_bootstrap<'a>(
        &'a self,
        fleet: &'a FleetHandle,
        script: &'a BootstrapScript,
    ) -> ProviderFuture<'a, (), Self::Error>;
}

/// Interface to the artifact store collaborator.
pub trait ArtifactStore {
    /// Store-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publishes an artifact and returns its handle.
    fn publish<'a>(
        &'a self,
        artifact: &'a ResolvedArtifact,
    ) -> ProviderFuture<'a, ArtifactHandle, Self::Error>;
}
