//! Staging stack composition.
//!
//! The composer evaluates the stack as a pure dependency graph, once,
//! top-to-bottom: network, then credential and database, then fleet, then
//! balancer, then the permission graph, then the bootstrap script. Every
//! configuration error is surfaced before the first provider call, so a
//! bad specification aborts all-or-nothing with no resources created.
//! Boot-time failures are deliberately not handled here: a failed boot
//! leaves an unhealthy instance that the fleet cycles out.

use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactHandle, ArtifactSource};
use crate::balancer::{BalancerSpec, BalancerSpecError};
use crate::bootstrap::{
    BootstrapError, BootstrapParams, BootstrapScript, BootstrapScriptGenerator,
    DatabaseBootstrap,
};
use crate::database::{DatabaseEndpoint, DatabaseSpec, DatabaseSpecError};
use crate::fleet::{FleetSpec, FleetSpecError};
use crate::network::NetworkPlan;
use crate::permissions::{Identity, PermissionEdge, PermissionError, PermissionGraph};
use crate::provider::{
    ArtifactStore, BalancerHandle, DatabaseHandle, FleetHandle, NetworkHandle, Provider,
};
use crate::secrets::{Credential, CredentialRequest, SecretError};

/// Database composition step: the managed instance plus its generated
/// credential.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabasePlan {
    /// Database instance parameters.
    pub spec: DatabaseSpec,
    /// Credential generation request.
    pub credential: CredentialRequest,
}

/// Everything the composer needs, as explicit values. Optional components
/// (database, balancer) are composition toggles, not alternate stacks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackSpec {
    /// Application name.
    pub app_name: String,
    /// Application archive version.
    pub app_version: String,
    /// Target region, exported to the application environment.
    pub region: String,
    /// Application environment name.
    pub app_env: String,
    /// Pre-validated network topology.
    pub network: NetworkPlan,
    /// Source of the application archive.
    pub archive: ArtifactSource,
    /// Source of the web-server configuration file.
    pub web_server_config: ArtifactSource,
    /// Database step, when enabled.
    pub database: Option<DatabasePlan>,
    /// Compute fleet parameters.
    pub fleet: FleetSpec,
    /// Load balancer step, when enabled.
    pub balancer: Option<BalancerSpec>,
    /// Public hostname to use when the balancer step is disabled.
    pub app_host_override: Option<String>,
}

/// Resolved stack, emitted once at the end of composition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackOutputs {
    /// Public application URL.
    pub application_url: String,
    /// Database endpoint, when the stack includes one.
    pub database_endpoint: Option<DatabaseEndpoint>,
    /// Fleet handle.
    pub fleet: FleetHandle,
    /// Balancer handle, when the stack includes one.
    pub balancer: Option<BalancerHandle>,
    /// Permission edges applied, in order.
    pub applied_edges: Vec<PermissionEdge>,
    /// The bootstrap script attached to the fleet.
    pub bootstrap: BootstrapScript,
}

/// Composes the staging stack against a provider and an artifact store.
#[derive(Debug)]
pub struct StackComposer<P, A> {
    provider: P,
    store: A,
}

impl<P, A> StackComposer<P, A>
where
    P: Provider,
    A: ArtifactStore,
{
    /// Creates a composer.
    #[must_use]
    pub const fn new(provider: P, store: A) -> Self {
        Self { provider, store }
    }

    /// Runs the composition pass.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Validation`] before any resource exists when
    /// the specification is invalid, and stage-specific variants when a
    /// provider or store call fails.
    pub async fn compose(
        &self,
        spec: &StackSpec,
    ) -> Result<StackOutputs, StackError<P::Error, A::Error>> {
        validate_spec(spec)?;

        let archive_key = format!("assets/{}-{}.zip", spec.app_name, spec.app_version);
        let archive = spec.archive.resolve(&archive_key)?;
        let web_config = spec.web_server_config.resolve("assets/nginx.conf")?;

        let archive_handle = self.publish(&archive).await?;
        let web_config_handle = self.publish(&web_config).await?;

        let network = self
            .provider
            .create_network(&spec.network)
            .await
            .map_err(StackError::Network)?;

        let database = self.compose_database(spec, &network).await?;

        let fleet = self
            .provider
            .create_fleet(&network, &spec.fleet)
            .await
            .map_err(StackError::Fleet)?;

        let balancer = self.compose_balancer(spec, &network, &fleet).await?;

        let graph = build_permission_graph(
            spec,
            &fleet,
            &archive_handle,
            &web_config_handle,
            database.as_ref(),
            balancer.as_ref(),
        )?;
        for edge in graph.edges() {
            self.provider
                .apply_permission(edge)
                .await
                .map_err(|source| StackError::Permission {
                    grantor: edge.grantor.clone(),
                    source,
                })?;
        }

        let app_host = resolve_app_host(spec, balancer.as_ref())?;
        let bootstrap = generate_bootstrap(
            spec,
            &app_host,
            &archive_handle,
            &web_config_handle,
            database.as_ref(),
        )?;
        self.provider
            .attach_bootstrap(&fleet, &bootstrap)
            .await
            .map_err(StackError::Attach)?;

        Ok(StackOutputs {
            application_url: format!("http://{app_host}"),
            database_endpoint: database
                .as_ref()
                .map(|step| step.handle.endpoint.clone()),
            fleet,
            balancer,
            applied_edges: graph.edges().to_vec(),
            bootstrap,
        })
    }

    async fn publish(
        &self,
        artifact: &crate::artifact::ResolvedArtifact,
    ) -> Result<ArtifactHandle, StackError<P::Error, A::Error>> {
        self.store
            .publish(artifact)
            .await
            .map_err(|source| StackError::Publish {
                key: artifact.key.clone(),
                source,
            })
    }

    async fn compose_database(
        &self,
        spec: &StackSpec,
        network: &NetworkHandle,
    ) -> Result<Option<DatabaseStep>, StackError<P::Error, A::Error>> {
        let Some(plan) = &spec.database else {
            return Ok(None);
        };
        let credential = self
            .provider
            .generate_credential(&plan.credential)
            .await
            .map_err(StackError::Credential)?;
        let handle = self
            .provider
            .create_database(network, &plan.spec, &credential)
            .await
            .map_err(StackError::Database)?;
        Ok(Some(DatabaseStep {
            handle,
            credential,
            port: plan.spec.port,
        }))
    }

    async fn compose_balancer(
        &self,
        spec: &StackSpec,
        network: &NetworkHandle,
        fleet: &FleetHandle,
    ) -> Result<Option<BalancerHandle>, StackError<P::Error, A::Error>> {
        let Some(balancer_spec) = &spec.balancer else {
            return Ok(None);
        };
        let handle = self
            .provider
            .create_balancer(network, fleet, balancer_spec)
            .await
            .map_err(StackError::Balancer)?;
        Ok(Some(handle))
    }
}

/// Resolved database step carried through composition.
#[derive(Clone, Debug, Eq, PartialEq)]
struct DatabaseStep {
    handle: DatabaseHandle,
    credential: Credential,
    port: u16,
}

fn validate_spec(spec: &StackSpec) -> Result<(), SpecValidationError> {
    require_spec_field("app_name", &spec.app_name)?;
    require_spec_field("app_version", &spec.app_version)?;
    require_spec_field("region", &spec.region)?;
    require_spec_field("app_env", &spec.app_env)?;
    if let Some(plan) = &spec.database {
        plan.spec.validate()?;
    }
    spec.fleet.validate()?;
    if let Some(balancer) = &spec.balancer {
        balancer.validate()?;
    } else if spec.app_host_override.is_none() {
        return Err(SpecValidationError::UnresolvableAppHost);
    }
    Ok(())
}

fn require_spec_field(field: &'static str, value: &str) -> Result<(), SpecValidationError> {
    if value.trim().is_empty() {
        return Err(SpecValidationError::MissingField(field));
    }
    Ok(())
}

fn build_permission_graph(
    spec: &StackSpec,
    fleet: &FleetHandle,
    archive: &ArtifactHandle,
    web_config: &ArtifactHandle,
    database: Option<&DatabaseStep>,
    balancer: Option<&BalancerHandle>,
) -> Result<PermissionGraph, SpecValidationError> {
    let mut builder = PermissionGraph::builder(fleet.identity.clone())
        .read_artifact(&archive.key)
        .read_artifact(&web_config.key);
    if let Some(step) = database {
        builder = builder.database(
            &step.handle.id,
            step.credential.secret_id.clone(),
            step.port,
        );
    }
    if let Some(handle) = balancer {
        let forward_port = spec
            .balancer
            .as_ref()
            .map_or(80, |balancer_spec| balancer_spec.forward_port);
        builder = builder.allow_ingress(&fleet.id, Identity::new(&handle.id)?, forward_port);
    }
    Ok(builder.build())
}

fn resolve_app_host(
    spec: &StackSpec,
    balancer: Option<&BalancerHandle>,
) -> Result<String, SpecValidationError> {
    balancer
        .map(|handle| handle.dns_name.clone())
        .or_else(|| spec.app_host_override.clone())
        .ok_or(SpecValidationError::UnresolvableAppHost)
}

fn generate_bootstrap(
    spec: &StackSpec,
    app_host: &str,
    archive: &ArtifactHandle,
    web_config: &ArtifactHandle,
    database: Option<&DatabaseStep>,
) -> Result<BootstrapScript, BootstrapError> {
    let params = BootstrapParams {
        app_name: spec.app_name.clone(),
        app_version: spec.app_version.clone(),
        archive: archive.clone(),
        web_server_config: web_config.clone(),
        app_host: app_host.to_owned(),
        database: database.map(|step| DatabaseBootstrap {
            endpoint: step.handle.endpoint.clone(),
            secret_id: step.credential.secret_id.clone(),
        }),
        region: spec.region.clone(),
        app_env: spec.app_env.clone(),
    };
    Ok(BootstrapScriptGenerator::new(params)?.generate())
}

/// Specification problems caught before any resource is created.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpecValidationError {
    /// Raised when a required field is blank.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    /// Raised when neither a balancer nor an app-host override is present.
    #[error("stack needs a load balancer or an explicit app host")]
    UnresolvableAppHost,
    /// Database specification problem.
    #[error(transparent)]
    Database(#[from] DatabaseSpecError),
    /// Fleet specification problem.
    #[error(transparent)]
    Fleet(#[from] FleetSpecError),
    /// Balancer specification problem.
    #[error(transparent)]
    Balancer(#[from] BalancerSpecError),
    /// Credential request problem.
    #[error(transparent)]
    Secret(#[from] SecretError),
    /// Identity wiring problem.
    #[error(transparent)]
    Permission(#[from] PermissionError),
}

/// Errors surfaced while composing the stack.
#[derive(Debug, Error)]
pub enum StackError<PE, AE>
where
    PE: std::error::Error + 'static,
    AE: std::error::Error + 'static,
{
    /// The specification is invalid; nothing was created.
    #[error("invalid stack specification: {0}")]
    Validation(#[from] SpecValidationError),
    /// A local artifact source could not be resolved; nothing was created.
    #[error("failed to resolve artifact: {0}")]
    Artifact(#[from] ArtifactError),
    /// The artifact store rejected a publication.
    #[error("failed to publish artifact `{key}`: {source}")]
    Publish {
        /// Object key being published.
        key: String,
        /// Store error.
        #[source]
        source: AE,
    },
    /// Network creation failed.
    #[error("failed to create network: {0}")]
    Network(#[source] PE),
    /// Credential generation failed.
    #[error("failed to generate credential: {0}")]
    Credential(#[source] PE),
    /// Database creation failed.
    #[error("failed to create database: {0}")]
    Database(#[source] PE),
    /// Fleet creation failed.
    #[error("failed to create fleet: {0}")]
    Fleet(#[source] PE),
    /// Balancer creation failed.
    #[error("failed to create load balancer: {0}")]
    Balancer(#[source] PE),
    /// A permission edge could not be applied.
    #[error("failed to apply permission edge from `{grantor}`: {source}")]
    Permission {
        /// Grantor of the failing edge.
        grantor: String,
        /// Provider error.
        #[source]
        source: PE,
    },
    /// Bootstrap script generation failed.
    #[error("bootstrap script generation failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    /// Attaching the bootstrap script failed.
    #[error("failed to attach bootstrap script: {0}")]
    Attach(#[source] PE),
}
