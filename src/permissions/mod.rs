//! Cross-cutting permission wiring between stack resources.
//!
//! Every grant and network-allow relationship the fleet needs at boot is
//! collected into one [`PermissionGraph`] so the edge set is exhaustive and
//! centrally reviewable. A missing edge is a silent runtime failure that
//! only surfaces when the bootstrap script runs, which is why edges are
//! never applied ad hoc from individual components.
//!
//! Edges are collected in a fixed order: artifact reads, then database
//! connect and secret read, then network path authorisations. The builder
//! deduplicates, so applying the same graph twice yields the same effective
//! grant set.

use thiserror::Error;

use crate::secrets::SecretId;


/// Identity of a principal that can be granted capabilities, typically the
/// fleet's instance role.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity(String);

impl Identity {
    /// Wraps an identity, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::EmptyIdentity`] when the identity is
    /// blank.
    pub fn new(id: impl Into<String>) -> Result<Self, PermissionError> {
        let trimmed = id.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(PermissionError::EmptyIdentity);
        }
        Ok(Self(trimmed))
    }

    /// The identity text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Capability conveyed by a single permission edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    /// Read a stored object (deployment artifact).
    ReadObject,
    /// Authenticate and connect to the database engine.
    Connect,
    /// Read the secret value from the credential store.
    ReadSecret,
    /// Accept inbound network traffic on a port.
    AllowNetwork {
        /// TCP port opened from grantee to grantor.
        port: u16,
    },
}

/// One grant relationship: `grantor` allows `grantee` the `capability`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionEdge {
    /// Resource identifier conveying the capability.
    pub grantor: String,
    /// Principal or resource receiving it.
    pub grantee: Identity,
    /// Capability conveyed.
    pub capability: Capability,
}

/// The complete, ordered, duplicate-free edge set for one stack.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermissionGraph {
    edges: Vec<PermissionEdge>,
}

impl PermissionGraph {
    /// Starts collecting edges for a fleet identity.
    #[must_use]
    pub const fn builder(fleet: Identity) -> PermissionGraphBuilder {
        PermissionGraphBuilder {
            fleet,
            artifact_ids: Vec::new(),
            database: None,
            ingress: Vec::new(),
        }
    }

    /// Edges in application order.
    #[must_use]
    pub fn edges(&self) -> &[PermissionEdge] {
        &self.edges
    }
}

/// Database wiring recorded by the builder.
#[derive(Clone, Debug, Eq, PartialEq)]
struct DatabaseGrants {
    database_id: String,
    secret_id: SecretId,
    port: u16,
}

/// Network ingress authorisation recorded by the builder.
#[derive(Clone, Debug, Eq, PartialEq)]
struct IngressGrant {
    accepting_resource: String,
    source: Identity,
    port: u16,
}

/// Collects permission edges and freezes them into a [`PermissionGraph`].
#[derive(Clone, Debug)]
pub struct PermissionGraphBuilder {
    fleet: Identity,
    artifact_ids: Vec<String>,
    database: Option<DatabaseGrants>,
    ingress: Vec<IngressGrant>,
}

impl PermissionGraphBuilder {
    /// Grants the fleet read access to a stored artifact.
    #[must_use]
    pub fn read_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_ids.push(artifact_id.into());
        self
    }

    /// Grants the fleet database connect and secret read access, and opens
    /// the database's port to the fleet.
    #[must_use]
    pub fn database(mut self, database_id: impl Into<String>, secret_id: SecretId, port: u16) -> Self {
        self.database = Some(DatabaseGrants {
            database_id: database_id.into(),
            secret_id,
            port,
        });
        self
    }

    /// Opens `port` on the accepting resource to traffic from `source`
    /// (for example the fleet accepting the balancer on its service port).
    #[must_use]
    pub fn allow_ingress(
        mut self,
        accepting_resource: impl Into<String>,
        source: Identity,
        port: u16,
    ) -> Self {
        self.ingress.push(IngressGrant {
            accepting_resource: accepting_resource.into(),
            source,
            port,
        });
        self
    }

    /// Freezes the edge set: artifact reads, then database grants, then
    /// the database network path, then the remaining ingress rules.
    /// Duplicate edges collapse, keeping first-seen order.
    #[must_use]
    pub fn build(self) -> PermissionGraph {
        let Self {
            fleet,
            artifact_ids,
            database,
            ingress,
        } = self;

        let mut edges: Vec<PermissionEdge> = Vec::new();

        for artifact_id in artifact_ids {
            push_unique(
                &mut edges,
                PermissionEdge {
                    grantor: artifact_id,
                    grantee: fleet.clone(),
                    capability: Capability::ReadObject,
                },
            );
        }

        if let Some(grants) = database {
            push_unique(
                &mut edges,
                PermissionEdge {
                    grantor: grants.database_id.clone(),
                    grantee: fleet.clone(),
                    capability: Capability::Connect,
                },
            );
            push_unique(
                &mut edges,
                PermissionEdge {
                    grantor: grants.secret_id.as_str().to_owned(),
                    grantee: fleet.clone(),
                    capability: Capability::ReadSecret,
                },
            );
            push_unique(
                &mut edges,
                PermissionEdge {
                    grantor: grants.database_id,
                    grantee: fleet.clone(),
                    capability: Capability::AllowNetwork { port: grants.port },
                },
            );
        }

        for grant in ingress {
            push_unique(
                &mut edges,
                PermissionEdge {
                    grantor: grant.accepting_resource,
                    grantee: grant.source,
                    capability: Capability::AllowNetwork { port: grant.port },
                },
            );
        }

        PermissionGraph { edges }
    }
}

fn push_unique(edges: &mut Vec<PermissionEdge>, edge: PermissionEdge) {
    if !edges.contains(&edge) {
        edges.push(edge);
    }
}

/// Errors raised by permission wiring types.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PermissionError {
    /// Raised when an identity is blank.
    #[error("identity must not be empty")]
    EmptyIdentity,
}
