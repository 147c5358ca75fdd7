//! Structured error types shared by the EMX crates.
//!
//! Every failure is one of a small set of families, each carrying the same
//! [`ErrorInfo`] payload: a stable machine readable code, a message, and
//! optional path, context and hint fields. Callers match on the family;
//! tooling reads the payload.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`EmxError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code, e.g. `db.experiment_missing`.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Filesystem path the failure refers to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Contextual key value pairs such as identifiers or exit codes.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional remediation hint for the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a payload with the given code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records the filesystem path the failure refers to.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().display().to_string());
        self
    }

    /// Adds one context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.code)?;
        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }
        for (key, value) in &self.context {
            write!(f, " {key}={value}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

/// Canonical error type of the EMX tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum EmxError {
    /// An identity or directory that should exist does not.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// Creation attempted over an already existing record.
    #[error("already exists: {0}")]
    AlreadyExists(ErrorInfo),
    /// A required file inside an otherwise present record is absent.
    #[error("missing file: {0}")]
    MissingFile(ErrorInfo),
    /// File content failed to parse into the required shape.
    #[error("malformed input: {0}")]
    MalformedInput(ErrorInfo),
    /// The build workspace has local modifications and cannot be trusted.
    #[error("dirty workspace: {0}")]
    DirtyWorkspace(ErrorInfo),
    /// A git invocation failed or reported an error.
    #[error("git failure: {0}")]
    Git(ErrorInfo),
    /// A platform build or run did not succeed.
    #[error("execution failure: {0}")]
    Execution(ErrorInfo),
    /// An operation was invoked in a state that forbids it.
    #[error("precondition violated: {0}")]
    Precondition(ErrorInfo),
    /// An untyped filesystem failure outside the families above.
    #[error("io failure: {0}")]
    Io(ErrorInfo),
}

impl EmxError {
    /// Returns the payload describing the error, whatever the family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            EmxError::NotFound(info)
            | EmxError::AlreadyExists(info)
            | EmxError::MissingFile(info)
            | EmxError::MalformedInput(info)
            | EmxError::DirtyWorkspace(info)
            | EmxError::Git(info)
            | EmxError::Execution(info)
            | EmxError::Precondition(info)
            | EmxError::Io(info) => info,
        }
    }
}
