//! Error taxonomy for publishing a file release.
//!
//! Failures are grouped the way callers need to react to them:
//! configuration and validation problems are detected before any network
//! traffic, authentication failures want fresh credentials, transport
//! failures carry every per-file cause, and structural failures name the
//! step and the page element that could not be found.

use std::path::PathBuf;

use thiserror::Error;

use crate::synchronise::SyncStep;

/// Why a file failed the naming rules enforced by the release service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingViolation {
    Missing,
    Unreadable,
    EmptyBaseName,
    ForbiddenCharacter(char),
}

impl std::fmt::Display for NamingViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "file does not exist"),
            Self::Unreadable => write!(f, "file is not readable"),
            Self::EmptyBaseName => write!(f, "file name must be at least one character long"),
            Self::ForbiddenCharacter(c) => {
                write!(f, "file name cannot contain {c:?} (no spaces, tildes or parentheses)")
            }
        }
    }
}

/// Rule violations on files or operator-supplied type names.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid file name {}: {violation}", path.display())]
    Naming {
        path: PathBuf,
        violation: NamingViolation,
    },

    #[error("{} is {len} bytes; change logs and release notes must be between {min} and {max} bytes", path.display())]
    Size {
        path: PathBuf,
        len: u64,
        min: u64,
        max: u64,
    },

    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    #[error("unknown processor type: {0}")]
    UnknownProcessorType(String),
}

/// Errors raised by the domain model itself.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field was read before it was set.
    #[error("{0} has not been set")]
    Unset(&'static str),

    /// A required text field was given an empty value.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure reported by a page-navigator implementation.
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("could not parse page {url}: {message}")]
    Markup { url: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Failure reported by a remote-copy channel.
#[derive(Debug, Error)]
pub enum RemoteCopyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication rejected for {user}@{host}")]
    Authentication { user: String, host: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// One file that could not be staged.
#[derive(Debug, Error)]
#[error("failed to transfer {}: {reason}", file.display())]
pub struct FileTransferError {
    pub file: PathBuf,
    pub reason: String,
    #[source]
    pub source: Option<RemoteCopyError>,
}

/// Every per-file failure from one `upload_all` call, in completion order.
#[derive(Debug, Error)]
#[error("{} of {attempted} file transfers failed", causes.len())]
pub struct UploadFailures {
    pub attempted: usize,
    pub causes: Vec<FileTransferError>,
}

impl UploadFailures {
    pub fn causes(&self) -> &[FileTransferError] {
        &self.causes
    }
}

/// Errors from the artifact transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not open remote-copy session to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: RemoteCopyError,
    },

    #[error("could not create staging directory {path}: {source}")]
    MakeDirectories {
        path: String,
        #[source]
        source: RemoteCopyError,
    },

    #[error(transparent)]
    Aggregate(#[from] UploadFailures),
}

/// Top-level error returned by [`crate::contract::Publisher::publish`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// Missing publisher, credentials or project/package linkage.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid credentials for user {user}")]
    InvalidCredentials { user: String },

    #[error("no such project: {0}")]
    NoSuchProject(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An expected link, form, table or field was absent from a page.
    #[error("{step}: expected {expected}")]
    Structural { step: SyncStep, expected: String },

    #[error("{step}: {source}")]
    Navigator {
        step: SyncStep,
        #[source]
        source: NavigatorError,
    },
}

impl PublishError {
    pub(crate) fn structural(step: SyncStep, expected: impl Into<String>) -> Self {
        Self::Structural {
            step,
            expected: expected.into(),
        }
    }

    /// Authentication failures are the only ones fixed by asking again.
    pub fn is_retryable_with_new_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials { .. })
    }

    /// Returns the per-file transport causes, if this is an aggregate failure.
    pub fn upload_failures(&self) -> Option<&UploadFailures> {
        match self {
            Self::Transport(TransportError::Aggregate(failures)) => Some(failures),
            _ => None,
        }
    }
}

impl From<ModelError> for PublishError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(v) => Self::Validation(v),
            other => Self::Configuration(other.to_string()),
        }
    }
}
