//! Managed database provisioning surface.
//!
//! The database itself is an opaque managed service; this module holds the
//! specification handed to a provider and the endpoint data that comes back.
//! The instance lives in the private tier and is reachable only through
//! permission-graph edges.

use thiserror::Error;

/// Lifecycle policy applied when the stack is torn down.
///
/// Staging stacks default to [`RemovalPolicy::Destroy`] (no snapshot
/// retention). That is a deliberate staging policy, not a production
/// default, so the flag is carried explicitly rather than hard-coded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RemovalPolicy {
    /// Destroy the database together with the stack.
    #[default]
    Destroy,
    /// Retain the database (and a final snapshot) past stack teardown.
    Retain,
}

/// Parameters for creating a managed relational database.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseSpec {
    /// Engine label the provider resolves (for example `mysql-8.0`).
    pub engine: String,
    /// Logical database name created at provision time.
    pub database_name: String,
    /// TCP port the engine listens on.
    pub port: u16,
    /// Teardown policy for the instance.
    pub removal_policy: RemovalPolicy,
}

impl DatabaseSpec {
    /// Creates a database specification, trimming string fields.
    #[must_use]
    pub fn new(engine: impl Into<String>, database_name: impl Into<String>, port: u16) -> Self {
        Self {
            engine: engine.into().trim().to_owned(),
            database_name: database_name.into().trim().to_owned(),
            port,
            removal_policy: RemovalPolicy::Destroy,
        }
    }

    /// Sets the teardown policy.
    #[must_use]
    pub const fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Validates the specification.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseSpecError`] when a field is blank or the port is
    /// zero.
    pub fn validate(&self) -> Result<(), DatabaseSpecError> {
        if self.engine.is_empty() {
            return Err(DatabaseSpecError::MissingField("engine"));
        }
        if self.database_name.is_empty() {
            return Err(DatabaseSpecError::MissingField("database_name"));
        }
        if self.port == 0 {
            return Err(DatabaseSpecError::InvalidPort);
        }
        Ok(())
    }
}

/// Connection endpoint produced once the database resolves. Immutable after
/// creation; consumed by the bootstrap script generator as a parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseEndpoint {
    /// Hostname of the database instance.
    pub host: String,
    /// TCP port the engine listens on.
    pub port: u16,
    /// Logical database name.
    pub database_name: String,
}

/// Errors raised while validating a database specification.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DatabaseSpecError {
    /// Raised when a required field is blank.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    /// Raised when the database port is zero.
    #[error("database port must be non-zero")]
    InvalidPort,
}
