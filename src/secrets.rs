//! Credential-store surface: secret identifiers and boot-time lookups.
//!
//! The crate never holds a secret value. Provisioning works with opaque
//! [`SecretId`]s; the only way a secret reaches an instance is through a
//! [`SecretFieldLookup`], which renders a runtime CLI invocation into the
//! bootstrap script so the value is fetched at first boot, not baked into
//! provisioning-time artifacts.

use serde::Deserialize;
use shell_escape::unix::escape;
use thiserror::Error;

/// Opaque identifier for a stored secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretId(String);

impl SecretId {
    /// Wraps a secret identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::EmptySecretId`] when the identifier is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, SecretError> {
        let trimmed = id.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(SecretError::EmptySecretId);
        }
        Ok(Self(trimmed))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Request for a generated database credential.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialRequest {
    /// Username the store generates a password for.
    pub username: String,
}

impl CredentialRequest {
    /// Creates a credential request, trimming the username.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::EmptyUsername`] when the username is blank.
    pub fn new(username: impl Into<String>) -> Result<Self, SecretError> {
        let trimmed = username.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(SecretError::EmptyUsername);
        }
        Ok(Self { username: trimmed })
    }
}

/// Reference to a generated credential: identifier and username only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credential {
    /// Identifier of the stored secret.
    pub secret_id: SecretId,
    /// Username the secret was generated for.
    pub username: String,
}

/// Shape of the stored secret payload, as the store's runtime API returns
/// it. Only ever deserialised on-instance; provisioning code deals in
/// [`SecretId`]s.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SecretPayload {
    /// Generated username.
    pub username: String,
    /// Generated password.
    pub password: String,
}

/// A boot-time secret lookup: one field of a stored secret, resolved by the
/// instance itself via the store's CLI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretFieldLookup {
    secret_id: SecretId,
    field: String,
}

impl SecretFieldLookup {
    /// Creates a lookup for one payload field.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidField`] unless the field is a
    /// lowercase identifier, which keeps the rendered `jq` filter inert.
    pub fn new(secret_id: SecretId, field: impl Into<String>) -> Result<Self, SecretError> {
        let field_name = field.into();
        let well_formed = !field_name.is_empty()
            && field_name
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch == '_');
        if !well_formed {
            return Err(SecretError::InvalidField(field_name));
        }
        Ok(Self {
            secret_id,
            field: field_name,
        })
    }

    /// Identifier of the secret being read.
    #[must_use]
    pub const fn secret_id(&self) -> &SecretId {
        &self.secret_id
    }

    /// Renders the runtime command substitution executed on the instance at
    /// boot. The secret id is shell-escaped; no secret value appears in the
    /// output.
    #[must_use]
    pub fn render(&self) -> String {
        let escaped_id = escape(self.secret_id.as_str().into());
        format!(
            "$(aws secretsmanager get-secret-value --secret-id {escaped_id} \
             --query SecretString | jq -r . | jq -r .{field})",
            field = self.field
        )
    }
}

/// Errors raised by credential-store surface types.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SecretError {
    /// Raised when a secret identifier is blank.
    #[error("secret identifier must not be empty")]
    EmptySecretId,
    /// Raised when a credential username is blank.
    #[error("credential username must not be empty")]
    EmptyUsername,
    /// Raised when a lookup field is not a lowercase identifier.
    #[error("secret field `{0}` must be a lowercase identifier")]
    InvalidField(String),
}
