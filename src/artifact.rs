//! Deployable artifact resolution and store handles.
//!
//! Artifacts (the application archive, the web-server configuration) can be
//! provided either inline or via a file path. This module centralises the
//! branching and file loading so configuration paths stay consistent, and
//! defines the handle types returned by the artifact store collaborator.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// Where an artifact's bytes come from before publication.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArtifactSource {
    /// Payload provided directly.
    Inline(String),
    /// Payload loaded from a local file.
    File(String),
}

impl ArtifactSource {
    /// Resolves the source into a publishable artifact under `key`.
    ///
    /// Payloads are trimmed for emptiness checks but returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the key or payload is empty, the path
    /// is blank, or the file cannot be read.
    pub fn resolve(&self, key: &str) -> Result<ResolvedArtifact, ArtifactError> {
        let trimmed_key = key.trim();
        if trimmed_key.is_empty() {
            return Err(ArtifactError::EmptyKey);
        }

        let payload = match self {
            Self::Inline(payload) => {
                validate_payload(payload)?;
                payload.clone()
            }
            Self::File(path) => {
                if path.trim().is_empty() {
                    return Err(ArtifactError::FilePathEmpty);
                }
                let content = read_to_string_ambient(path).map_err(|message| {
                    ArtifactError::FileRead {
                        path: path.clone(),
                        message,
                    }
                })?;
                validate_payload(&content).map_err(|err| match err {
                    ArtifactError::PayloadEmpty => ArtifactError::FileEmpty,
                    other => other,
                })?;
                content
            }
        };

        Ok(ResolvedArtifact {
            key: trimmed_key.to_owned(),
            payload,
        })
    }
}

/// An artifact ready for publication to the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedArtifact {
    /// Object key the store files the artifact under.
    pub key: String,
    /// Artifact bytes.
    pub payload: String,
}

/// Handle returned by the artifact store once an artifact is published.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArtifactHandle {
    /// Object key within the store.
    pub key: String,
    /// Location instances fetch the artifact from at boot.
    pub object_url: String,
}

impl ArtifactHandle {
    /// File name component of the object key, used for on-instance paths.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.key
            .rsplit_once('/')
            .map_or(self.key.as_str(), |(_, name)| name)
    }
}

/// Errors raised while resolving artifacts.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ArtifactError {
    /// Raised when the object key is blank.
    #[error("artifact key must not be empty")]
    EmptyKey,
    /// Raised when an inline payload is empty or only whitespace.
    #[error("artifact payload must not be empty")]
    PayloadEmpty,
    /// Raised when a file path is empty or only whitespace.
    #[error("artifact file path must not be empty")]
    FilePathEmpty,
    /// Raised when a file resolves to empty or only whitespace.
    #[error("artifact file must not be empty")]
    FileEmpty,
    /// Raised when reading the file source fails.
    #[error("failed to read artifact file `{path}`: {message}")]
    FileRead {
        /// Path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

fn validate_payload(payload: &str) -> Result<(), ArtifactError> {
    if payload.trim().is_empty() {
        return Err(ArtifactError::PayloadEmpty);
    }
    Ok(())
}

fn read_to_string_ambient(path: &str) -> Result<String, String> {
    let path_buf = Utf8Path::new(path);

    let (dir_path, file_path) = if path_buf.is_absolute() {
        let parent = path_buf
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path_buf}"))?;
        let file_name = path_buf
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path_buf}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path_buf)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}
