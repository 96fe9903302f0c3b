//! Compute fleet specification.
//!
//! A fleet is a pool of interchangeable instances in the public tier whose
//! size follows a wall-clock [`FleetSchedule`] rather than load signals.
//! Capacity bounds are enforced independently of the schedule: an entry
//! outside `[min, max]` is a configuration error rejected here, never
//! silently clamped.

use std::time::Duration;

use thiserror::Error;

use crate::schedule::FleetSchedule;

/// Signal used to decide whether an individual instance is healthy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HealthCheckSource {
    /// The load balancer's health check, with a grace period after launch
    /// so slow bootstrap scripts are not cycled out prematurely.
    Balancer {
        /// Time after launch before health is evaluated.
        grace: Duration,
    },
    /// The provider's local instance status check only.
    Instance,
}

/// Parameters for creating an autoscaled compute fleet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FleetSpec {
    /// Instance flavour label the provider resolves.
    pub instance_type: String,
    /// Lower capacity bound.
    pub min_capacity: u32,
    /// Upper capacity bound (the fleet ceiling).
    pub max_capacity: u32,
    /// Health evaluation source.
    pub health_check: HealthCheckSource,
    /// Optional time-windowed scaling table.
    pub schedule: Option<FleetSchedule>,
    /// Whether to open SSH ingress for operator access.
    pub ssh_ingress: bool,
}

impl FleetSpec {
    /// Creates a fleet specification with instance-level health checks and
    /// no schedule.
    #[must_use]
    pub fn new(instance_type: impl Into<String>, min_capacity: u32, max_capacity: u32) -> Self {
        Self {
            instance_type: instance_type.into().trim().to_owned(),
            min_capacity,
            max_capacity,
            health_check: HealthCheckSource::Instance,
            schedule: None,
            ssh_ingress: false,
        }
    }

    /// Uses the balancer's health signal with the given launch grace.
    #[must_use]
    pub const fn balancer_health(mut self, grace: Duration) -> Self {
        self.health_check = HealthCheckSource::Balancer { grace };
        self
    }

    /// Attaches a scaling schedule.
    #[must_use]
    pub fn schedule(mut self, schedule: FleetSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Opens SSH ingress to the fleet.
    #[must_use]
    pub const fn ssh_ingress(mut self, enabled: bool) -> Self {
        self.ssh_ingress = enabled;
        self
    }

    /// Validates the specification, including every schedule entry against
    /// the capacity bounds.
    ///
    /// # Errors
    ///
    /// Returns [`FleetSpecError`] when the instance type is blank, the
    /// bounds are inverted, or a schedule entry falls outside them.
    pub fn validate(&self) -> Result<(), FleetSpecError> {
        if self.instance_type.is_empty() {
            return Err(FleetSpecError::MissingInstanceType);
        }
        if self.min_capacity > self.max_capacity {
            return Err(FleetSpecError::InvertedBounds {
                min: self.min_capacity,
                max: self.max_capacity,
            });
        }
        if let Some(schedule) = &self.schedule {
            for entry in schedule.entries() {
                let capacity = entry.desired_capacity;
                if capacity < self.min_capacity || capacity > self.max_capacity {
                    return Err(FleetSpecError::ScheduleOutOfBounds {
                        capacity,
                        min: self.min_capacity,
                        max: self.max_capacity,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Errors raised while validating a fleet specification.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FleetSpecError {
    /// Raised when the instance type is blank.
    #[error("fleet instance type must not be empty")]
    MissingInstanceType,
    /// Raised when the minimum capacity exceeds the maximum.
    #[error("fleet capacity bounds are inverted: min {min} > max {max}")]
    InvertedBounds {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// Raised when a schedule entry falls outside the capacity bounds.
    #[error("schedule capacity {capacity} is outside fleet bounds [{min}, {max}]")]
    ScheduleOutOfBounds {
        /// Offending entry capacity.
        capacity: u32,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}
