//! Load balancer front-end specification.
//!
//! One public HTTP listener forwarding unconditionally to the fleet, with
//! periodic health checks against an application-defined path and optional
//! bounded-duration sticky sessions.

use std::time::Duration;

use thiserror::Error;

/// Parameters for the public load balancer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalancerSpec {
    /// Public listener port.
    pub listener_port: u16,
    /// Backend port traffic is forwarded to on fleet instances.
    pub forward_port: u16,
    /// Absolute path polled by the health check.
    pub health_check_path: String,
    /// Sticky-cookie duration pinning a client to one backend, when set.
    pub stickiness: Option<Duration>,
}

impl BalancerSpec {
    /// Creates a balancer specification without stickiness.
    #[must_use]
    pub fn new(listener_port: u16, forward_port: u16, health_check_path: impl Into<String>) -> Self {
        Self {
            listener_port,
            forward_port,
            health_check_path: health_check_path.into().trim().to_owned(),
            stickiness: None,
        }
    }

    /// Pins clients to one backend for the given duration via a cookie.
    #[must_use]
    pub const fn stickiness(mut self, duration: Duration) -> Self {
        self.stickiness = Some(duration);
        self
    }

    /// Validates the specification.
    ///
    /// # Errors
    ///
    /// Returns [`BalancerSpecError`] when a port is zero or the health
    /// check path is not absolute.
    pub fn validate(&self) -> Result<(), BalancerSpecError> {
        if self.listener_port == 0 || self.forward_port == 0 {
            return Err(BalancerSpecError::InvalidPort);
        }
        if !self.health_check_path.starts_with('/') {
            return Err(BalancerSpecError::InvalidHealthCheckPath(
                self.health_check_path.clone(),
            ));
        }
        Ok(())
    }
}

/// Errors raised while validating a balancer specification.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BalancerSpecError {
    /// Raised when the listener or forward port is zero.
    #[error("balancer ports must be non-zero")]
    InvalidPort,
    /// Raised when the health check path is not absolute.
    #[error("health check path `{0}` must start with `/`")]
    InvalidHealthCheckPath(String),
}
