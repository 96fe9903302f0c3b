//! Bootstrap script generation.
//!
//! Turns the parameters that only exist after composition resolves (artifact
//! locations, database endpoint, secret identifier, public hostname) into
//! the ordered command sequence a fleet instance executes at first boot.
//!
//! Parameters come in two kinds, modelled explicitly by [`ScriptParam`]:
//! build-time values interpolated as escaped literals, and boot-time values
//! rendered as runtime lookups the instance evaluates itself. A secret value
//! therefore never appears in the generated text.
//!
//! Every step is fatal on failure (`set -e`) and nothing retries in-script:
//! a failed boot leaves the instance unhealthy and the fleet's replacement
//! policy is the retry mechanism.

use shell_escape::unix::escape;
use thiserror::Error;

use crate::artifact::ArtifactHandle;
use crate::database::DatabaseEndpoint;
use crate::secrets::{SecretError, SecretFieldLookup, SecretId};


/// Boot phases in execution order. Order is load-bearing: artifacts are
/// fetched before anything installs, configuration resolves before
/// dependencies install, migrations run after the application secrets
/// exist.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BootPhase {
    /// Download artifacts from the store.
    FetchArtifacts,
    /// Install and enable the web server.
    InstallWebServer,
    /// Install the language runtime and its package manager.
    InstallLanguageRuntime,
    /// Unpack the application archive into place.
    UnpackApplication,
    /// Seed the environment file, resolving boot-time secrets.
    ResolveConfiguration,
    /// Apply build-time values to the environment template.
    ApplyEnvironmentTemplate,
    /// Install application dependencies.
    InstallDependencies,
    /// Generate the application's own secrets.
    InitialiseAppSecrets,
    /// Run database migrations.
    RunMigrations,
    /// Hand ownership of the tree to the web server user.
    FixOwnership,
}

impl BootPhase {
    /// The fixed execution order.
    pub const ORDER: [Self; 10] = [
        Self::FetchArtifacts,
        Self::InstallWebServer,
        Self::InstallLanguageRuntime,
        Self::UnpackApplication,
        Self::ResolveConfiguration,
        Self::ApplyEnvironmentTemplate,
        Self::InstallDependencies,
        Self::InitialiseAppSecrets,
        Self::RunMigrations,
        Self::FixOwnership,
    ];
}

/// A value interpolated into the script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScriptParam {
    /// Known at generation time; rendered as an escaped literal.
    BuildTime(String),
    /// Deferred to first boot; rendered as a runtime lookup invocation.
    BootTime(SecretFieldLookup),
}

impl ScriptParam {
    /// Renders the parameter for use in a `sed` environment substitution.
    /// Build-time literals get their slashes escaped for the pattern;
    /// boot-time lookups render verbatim so the shell expands them on the
    /// instance.
    #[must_use]
    pub fn render_for_substitution(&self) -> String {
        match self {
            Self::BuildTime(value) => value.replace('/', "\\/"),
            Self::BootTime(lookup) => lookup.render(),
        }
    }
}

/// Database wiring for the boot script: the resolved endpoint plus the
/// secret the instance reads at boot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseBootstrap {
    /// Resolved database endpoint.
    pub endpoint: DatabaseEndpoint,
    /// Identifier of the database credential secret.
    pub secret_id: SecretId,
}

/// Inputs to script generation, all resolved during composition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapParams {
    /// Application name; also the install directory under `/var/www`.
    pub app_name: String,
    /// Application archive version.
    pub app_version: String,
    /// Published application archive.
    pub archive: ArtifactHandle,
    /// Published web-server configuration file.
    pub web_server_config: ArtifactHandle,
    /// Public hostname the application is served under.
    pub app_host: String,
    /// Database wiring, when the stack includes a database.
    pub database: Option<DatabaseBootstrap>,
    /// Region exported to the application environment.
    pub region: String,
    /// Application environment name (for example `staging`).
    pub app_env: String,
}

/// The generated one-shot boot script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapScript {
    commands: Vec<String>,
}

impl BootstrapScript {
    /// Ordered commands, excluding the interpreter header.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// The complete script text as written to the instance.
    #[must_use]
    pub fn shell(&self) -> String {
        let mut text = String::from("#!/bin/bash\nset -e\n");
        for command in &self.commands {
            text.push_str(command);
            text.push('\n');
        }
        text
    }
}

/// Renders [`BootstrapParams`] into a [`BootstrapScript`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapScriptGenerator {
    params: BootstrapParams,
    lookups: Option<DatabaseLookups>,
}

/// Boot-time credential lookups, present when the stack has a database.
#[derive(Clone, Debug, Eq, PartialEq)]
struct DatabaseLookups {
    username: SecretFieldLookup,
    password: SecretFieldLookup,
}

impl BootstrapScriptGenerator {
    /// Validates the parameters and creates a generator.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] when a field is blank or the application
    /// name/version contain characters unsafe for path interpolation.
    pub fn new(params: BootstrapParams) -> Result<Self, BootstrapError> {
        validate_token("app_name", &params.app_name)?;
        validate_token("app_version", &params.app_version)?;
        require("app_host", &params.app_host)?;
        require("region", &params.region)?;
        require("app_env", &params.app_env)?;
        require("archive.object_url", &params.archive.object_url)?;
        require(
            "web_server_config.object_url",
            &params.web_server_config.object_url,
        )?;
        let lookups = params
            .database
            .as_ref()
            .map(|database| {
                require("database.endpoint.host", &database.endpoint.host)?;
                Ok::<_, BootstrapError>(DatabaseLookups {
                    username: SecretFieldLookup::new(database.secret_id.clone(), "username")?,
                    password: SecretFieldLookup::new(database.secret_id.clone(), "password")?,
                })
            })
            .transpose()?;
        Ok(Self { params, lookups })
    }

    /// Renders every phase in [`BootPhase::ORDER`].
    #[must_use]
    pub fn generate(&self) -> BootstrapScript {
        let commands = BootPhase::ORDER
            .iter()
            .flat_map(|phase| self.phase_commands(*phase))
            .collect();
        BootstrapScript { commands }
    }

    fn phase_commands(&self, phase: BootPhase) -> Vec<String> {
        match phase {
            BootPhase::FetchArtifacts => self.fetch_artifacts(),
            BootPhase::InstallWebServer => self.install_web_server(),
            BootPhase::InstallLanguageRuntime => Self::install_language_runtime(),
            BootPhase::UnpackApplication => self.unpack_application(),
            BootPhase::ResolveConfiguration => self.resolve_configuration(),
            BootPhase::ApplyEnvironmentTemplate => self.apply_environment_template(),
            BootPhase::InstallDependencies => Self::install_dependencies(),
            BootPhase::InitialiseAppSecrets => Self::initialise_app_secrets(),
            BootPhase::RunMigrations => self.run_migrations(),
            BootPhase::FixOwnership => self.fix_ownership(),
        }
    }

    fn fetch_artifacts(&self) -> Vec<String> {
        vec![
            fetch_command(&self.params.web_server_config),
            fetch_command(&self.params.archive),
        ]
    }

    fn install_web_server(&self) -> Vec<String> {
        let config_file = escape(
            format!("/tmp/{}", self.params.web_server_config.file_name()).into(),
        )
        .into_owned();
        vec![
            String::from("dnf update -y"),
            String::from("dnf install -y unzip"),
            String::from("dnf install -y nginx"),
            format!("cp {config_file} /etc/nginx/nginx.conf"),
            String::from("systemctl start nginx"),
            String::from("systemctl enable nginx"),
        ]
    }

    fn install_language_runtime() -> Vec<String> {
        vec![
            String::from("dnf install -y php8.2 php8.2-zip php8.2-mysqlnd"),
            String::from(r#"sed -i "s/^user = .*$/user = nginx/" /etc/php-fpm.d/www.conf"#),
            String::from(r#"sed -i "s/^group = .*$/group = nginx/" /etc/php-fpm.d/www.conf"#),
            String::from("export HOME=/root"),
            String::from("cd /tmp"),
            String::from(
                r#"php -r "copy('https://getcomposer.org/installer', 'composer-setup.php');""#,
            ),
            String::from("php composer-setup.php --install-dir=/usr/local/bin --filename=composer"),
            String::from("systemctl start php-fpm"),
            String::from("systemctl enable php-fpm"),
        ]
    }

    fn unpack_application(&self) -> Vec<String> {
        let archive_file = escape(
            format!("/tmp/{}", self.params.archive.file_name()).into(),
        )
        .into_owned();
        let app = &self.params.app_name;
        let version = &self.params.app_version;
        vec![
            String::from("mkdir -p /var/www"),
            format!("unzip {archive_file} -d /var/www"),
            format!("mv /var/www/{app}-{version} /var/www/{app}"),
            format!("cd /var/www/{app}"),
        ]
    }

    fn resolve_configuration(&self) -> Vec<String> {
        let mut commands = vec![String::from("cp .env.example .env")];
        if let Some(lookups) = &self.lookups {
            commands.push(env_substitution(
                "DB_USERNAME",
                &ScriptParam::BootTime(lookups.username.clone()),
            ));
            commands.push(env_substitution(
                "DB_PASSWORD",
                &ScriptParam::BootTime(lookups.password.clone()),
            ));
        }
        commands
    }

    fn apply_environment_template(&self) -> Vec<String> {
        let params = &self.params;
        let mut build_time = vec![
            ("APP_ENV", params.app_env.clone()),
            ("APP_DEBUG", String::from("false")),
            ("APP_URL", format!("http://{}", params.app_host)),
        ];
        if let Some(database) = &params.database {
            build_time.push(("DB_HOST", database.endpoint.host.clone()));
        }
        build_time.push(("MAIL_MAILER", String::from("log")));
        build_time.push(("AWS_DEFAULT_REGION", params.region.clone()));
        build_time
            .into_iter()
            .map(|(key, value)| env_substitution(key, &ScriptParam::BuildTime(value)))
            .collect()
    }

    fn install_dependencies() -> Vec<String> {
        vec![String::from(
            "composer install --prefer-dist --no-progress --no-suggest",
        )]
    }

    fn initialise_app_secrets() -> Vec<String> {
        vec![String::from("php artisan key:generate")]
    }

    fn run_migrations(&self) -> Vec<String> {
        if self.params.database.is_none() {
            return Vec::new();
        }
        vec![String::from("php artisan migrate --seed")]
    }

    fn fix_ownership(&self) -> Vec<String> {
        vec![format!("chown -R nginx:nginx /var/www/{}", self.params.app_name)]
    }
}

fn fetch_command(artifact: &ArtifactHandle) -> String {
    let url = escape(artifact.object_url.as_str().into());
    let target = escape(format!("/tmp/{}", artifact.file_name()).into()).into_owned();
    format!("aws s3 cp {url} {target}")
}

fn env_substitution(key: &str, value: &ScriptParam) -> String {
    format!(
        r#"sed -i "s/^{key}=.*$/{key}={}/" .env"#,
        value.render_for_substitution()
    )
}

fn require(field: &'static str, value: &str) -> Result<(), BootstrapError> {
    if value.trim().is_empty() {
        return Err(BootstrapError::MissingField(field));
    }
    Ok(())
}

fn validate_token(field: &'static str, value: &str) -> Result<(), BootstrapError> {
    require(field, value)?;
    let safe = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
    if !safe {
        return Err(BootstrapError::UnsafeToken {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Errors raised while building a script generator.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BootstrapError {
    /// Raised when a required parameter is blank.
    #[error("missing or empty bootstrap parameter: {0}")]
    MissingField(&'static str),
    /// Raised when a path-interpolated parameter contains unsafe
    /// characters.
    #[error("bootstrap parameter {field} contains unsafe characters: `{value}`")]
    UnsafeToken {
        /// Offending parameter name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// Raised when a secret lookup cannot be constructed.
    #[error(transparent)]
    Secret(#[from] SecretError),
}
