//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ipnet::Ipv4Net;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::artifact::ArtifactSource;
use crate::balancer::BalancerSpec;
use crate::database::{DatabaseSpec, RemovalPolicy};
use crate::fleet::FleetSpec;
use crate::network::{NetworkPlan, TierKind, TierSpec};
use crate::schedule::{FleetSchedule, ScheduleEntry, ScheduleError};
use crate::secrets::CredentialRequest;
use crate::stack::{DatabasePlan, StackSpec};

/// Stack configuration derived from environment variables, configuration
/// files, and defaults.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "STAGEHAND",
    discovery(
        app_name = "stagehand",
        env_var = "STAGEHAND_CONFIG_PATH",
        config_file_name = "stagehand.toml",
        dotfile_name = ".stagehand.toml",
        project_file_name = "stagehand.toml"
    )
)]
pub struct StackConfig {
    /// Application name, used for artifact keys and on-instance paths.
    pub app_name: String,
    /// Application archive version to deploy.
    pub app_version: String,
    /// Target region, exported to the application environment at boot.
    pub region: String,
    /// Application environment name. Defaults to `staging`.
    #[ortho_config(default = "staging".to_owned())]
    pub app_env: String,
    /// Parent address space carved into per-zone subnets.
    #[ortho_config(default = "10.0.0.0/16".to_owned())]
    pub network_cidr: String,
    /// Number of availability zones each tier spans.
    #[ortho_config(default = 2)]
    pub zone_count: u8,
    /// Prefix length of each per-zone subnet.
    #[ortho_config(default = 24)]
    pub subnet_prefix_len: u8,
    /// Instance flavour for fleet members.
    #[ortho_config(default = "t2.micro".to_owned())]
    pub instance_type: String,
    /// Lower fleet capacity bound. Defaults to zero so the fleet scales to
    /// nothing outside working hours.
    #[ortho_config(default = 0)]
    pub min_capacity: u32,
    /// Upper fleet capacity bound.
    #[ortho_config(default = 2)]
    pub max_capacity: u32,
    /// Seconds after instance launch before balancer health is evaluated.
    #[ortho_config(default = 300)]
    pub health_grace_secs: u64,
    /// Whether to open SSH ingress for operator access.
    #[ortho_config(default = false)]
    pub ssh_ingress: bool,
    /// Whether the stack includes a managed database.
    #[ortho_config(default = true)]
    pub with_database: bool,
    /// Retain the database (and a final snapshot) past stack teardown.
    #[ortho_config(default = false)]
    pub retain_database: bool,
    /// Database engine label.
    #[ortho_config(default = "mysql-8.0".to_owned())]
    pub database_engine: String,
    /// Logical database name. Defaults to the application name.
    pub database_name: Option<String>,
    /// Database port.
    #[ortho_config(default = 3306)]
    pub database_port: u16,
    /// Username the credential store generates a password for.
    #[ortho_config(default = "admin".to_owned())]
    pub database_username: String,
    /// Whether the stack includes a public load balancer.
    #[ortho_config(default = true)]
    pub with_load_balancer: bool,
    /// Public listener port.
    #[ortho_config(default = 80)]
    pub listener_port: u16,
    /// Backend port traffic is forwarded to on fleet instances.
    #[ortho_config(default = 80)]
    pub forward_port: u16,
    /// Absolute path polled by the balancer health check.
    #[ortho_config(default = "/login".to_owned())]
    pub health_check_path: String,
    /// Sticky-cookie duration in seconds. Zero disables stickiness.
    #[ortho_config(default = 86_400)]
    pub stickiness_secs: u64,
    /// Whether the fleet follows the wall-clock scaling schedule.
    #[ortho_config(default = true)]
    pub with_scheduled_scaling: bool,
    /// Named timezone the schedule triggers fire in.
    #[ortho_config(default = "Asia/Tokyo".to_owned())]
    pub schedule_timezone: String,
    /// Public hostname to use when the load balancer is disabled.
    pub app_host: Option<String>,
    /// Local path to the application archive.
    pub archive_path: String,
    /// Local path to the web-server configuration file.
    pub web_server_config_path: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl StackConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to stagehand.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags
    /// in that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("stagehand")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages
    /// include guidance on how to provide missing values via environment
    /// variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.app_name,
            &FieldMetadata::new("application name", "STAGEHAND_APP_NAME", "app_name"),
        )?;
        Self::require_field(
            &self.app_version,
            &FieldMetadata::new(
                "application version",
                "STAGEHAND_APP_VERSION",
                "app_version",
            ),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("target region", "STAGEHAND_REGION", "region"),
        )?;
        Self::require_field(
            &self.archive_path,
            &FieldMetadata::new(
                "application archive path",
                "STAGEHAND_ARCHIVE_PATH",
                "archive_path",
            ),
        )?;
        Self::require_field(
            &self.web_server_config_path,
            &FieldMetadata::new(
                "web-server configuration path",
                "STAGEHAND_WEB_SERVER_CONFIG_PATH",
                "web_server_config_path",
            ),
        )?;
        if !self.with_load_balancer {
            let host = self.app_host.as_deref().unwrap_or_default();
            Self::require_field(
                host,
                &FieldMetadata::new(
                    "application host (required without a load balancer)",
                    "STAGEHAND_APP_HOST",
                    "app_host",
                ),
            )?;
        }
        Ok(())
    }

    /// Builds a [`StackSpec`] from the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails, the network CIDR does
    /// not parse, or the topology/schedule cannot be built.
    pub fn as_stack_spec(&self) -> Result<StackSpec, ConfigError> {
        self.validate()?;

        let cidr: Ipv4Net = self
            .network_cidr
            .parse()
            .map_err(|_| ConfigError::InvalidCidr(self.network_cidr.clone()))?;
        let tiers = [
            TierSpec::new("Public", TierKind::Public, self.subnet_prefix_len),
            TierSpec::new(
                "Private",
                TierKind::PrivateWithEgress,
                self.subnet_prefix_len,
            ),
        ];
        let network = NetworkPlan::new(cidr, self.zone_count, &tiers)
            .map_err(|err| ConfigError::Network(err.to_string()))?
            .with_service_gateway("object-storage");

        let mut fleet = FleetSpec::new(&self.instance_type, self.min_capacity, self.max_capacity)
            .ssh_ingress(self.ssh_ingress);
        if self.with_load_balancer {
            fleet = fleet.balancer_health(Duration::from_secs(self.health_grace_secs));
        }
        if self.with_scheduled_scaling {
            fleet = fleet.schedule(default_schedule(&self.schedule_timezone)?);
        }

        let database = if self.with_database {
            let policy = if self.retain_database {
                RemovalPolicy::Retain
            } else {
                RemovalPolicy::Destroy
            };
            let database_name = self
                .database_name
                .clone()
                .unwrap_or_else(|| self.app_name.clone());
            Some(DatabasePlan {
                spec: DatabaseSpec::new(&self.database_engine, database_name, self.database_port)
                    .removal_policy(policy),
                credential: CredentialRequest::new(&self.database_username)
                    .map_err(|err| ConfigError::MissingField(err.to_string()))?,
            })
        } else {
            None
        };

        let balancer = self.with_load_balancer.then(|| {
            let mut spec = BalancerSpec::new(
                self.listener_port,
                self.forward_port,
                &self.health_check_path,
            );
            if self.stickiness_secs > 0 {
                spec = spec.stickiness(Duration::from_secs(self.stickiness_secs));
            }
            spec
        });

        Ok(StackSpec {
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            region: self.region.clone(),
            app_env: self.app_env.clone(),
            network,
            archive: ArtifactSource::File(self.archive_path.clone()),
            web_server_config: ArtifactSource::File(self.web_server_config_path.clone()),
            database,
            fleet,
            balancer,
            app_host_override: self.app_host.clone(),
        })
    }
}

/// The working-hours scaling table: scale to zero overnight, hold one
/// instance through the day, and add a second around the morning, lunch,
/// and evening peaks.
///
/// # Errors
///
/// Returns [`ConfigError::Schedule`] when the timezone is blank.
pub fn default_schedule(timezone: &str) -> Result<FleetSchedule, ConfigError> {
    let table = [
        (1, 0, 0),
        (6, 0, 1),
        (8, 30, 2),
        (9, 30, 1),
        (12, 0, 2),
        (13, 0, 1),
        (17, 30, 2),
        (18, 30, 1),
    ];
    let entries = table
        .into_iter()
        .map(|(hour, minute, capacity)| ScheduleEntry::at(hour, minute, capacity))
        .collect::<Result<Vec<_>, ScheduleError>>()?;
    Ok(FleetSchedule::new(timezone, entries)?)
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Indicates the network CIDR does not parse as IPv4.
    #[error("invalid network CIDR `{0}`")]
    InvalidCidr(String),
    /// Surfaces network topology planning failures.
    #[error("network topology invalid: {0}")]
    Network(String),
    /// Surfaces scaling schedule construction failures.
    #[error("scaling schedule invalid: {0}")]
    Schedule(#[from] ScheduleError),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
