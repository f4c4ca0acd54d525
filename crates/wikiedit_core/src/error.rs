use serde::Serialize;
use thiserror::Error;

/// Failure while reading a page before any transformation ran.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("page does not exist: {title}")]
    NotFound { title: String },
    #[error("failed to read {title}: {reason}")]
    Client { title: String, reason: String },
}

/// Raised by a transformation that cannot handle the content it was given.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct TransformError {
    pub reason: String,
}

impl TransformError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The wiki rejected a write (permissions, edit conflict, protection, ...).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to save {title}: {reason}")]
pub struct SaveError {
    pub title: String,
    pub reason: String,
}

/// Errors that abort a run before any page is touched.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{0} is required for a live run")]
    MissingCredentials(&'static str),
    #[error("MediaWiki login failed: {0}")]
    Login(String),
    #[error("failed to build wiki client: {0}")]
    Client(String),
    #[error("failed to resolve targets: {0}")]
    Targets(String),
    #[error("invalid transform: {0}")]
    Transform(String),
    #[error("invalid run options: {0}")]
    Options(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Transform,
    Save,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Transform => "transform",
            Self::Save => "save",
        }
    }
}

/// Flattened per-page error as stored in a run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl From<FetchError> for PageFailure {
    fn from(error: FetchError) -> Self {
        Self {
            kind: FailureKind::Fetch,
            reason: error.to_string(),
        }
    }
}

impl From<TransformError> for PageFailure {
    fn from(error: TransformError) -> Self {
        Self {
            kind: FailureKind::Transform,
            reason: error.reason,
        }
    }
}

impl From<SaveError> for PageFailure {
    fn from(error: SaveError) -> Self {
        Self {
            kind: FailureKind::Save,
            reason: error.reason,
        }
    }
}
