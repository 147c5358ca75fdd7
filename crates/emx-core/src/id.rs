//! Experiment and run identities.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{EmxError, ErrorInfo};

/// Hierarchical four segment identity of an experiment record.
///
/// The segments are positional: architecture, experiment type, parameter set
/// id and data id. Joined with `/` they form both the primary key and the
/// record's directory relative to the logs root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpId {
    arch: String,
    exp_type: String,
    params_id: String,
    data_id: String,
}

impl ExpId {
    /// Parses an identity of the form `{arch}/{type}/{params}/{data}`.
    ///
    /// Anything other than exactly four non empty segments fails with the
    /// not-found family: such a string can never name a record. Relative
    /// `.`/`..` segments are rejected the same way, so [`ExpId::rel_path`]
    /// always resolves to a directory under the logs root.
    pub fn parse(raw: &str) -> Result<Self, EmxError> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() != 4 || segments.iter().any(|segment| segment.is_empty()) {
            return Err(EmxError::NotFound(
                ErrorInfo::new(
                    "id.segments",
                    "experiment id must have exactly four non empty segments",
                )
                .with_context("id", raw),
            ));
        }
        if segments.iter().any(|segment| matches!(*segment, "." | "..")) {
            return Err(EmxError::NotFound(
                ErrorInfo::new(
                    "id.segments",
                    "experiment id segments must not be relative path components",
                )
                .with_context("id", raw),
            ));
        }
        Ok(Self {
            arch: segments[0].to_string(),
            exp_type: segments[1].to_string(),
            params_id: segments[2].to_string(),
            data_id: segments[3].to_string(),
        })
    }

    /// Architecture segment, e.g. `arm8`.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Experiment type segment, e.g. `exps2`.
    pub fn exp_type(&self) -> &str {
        &self.exp_type
    }

    /// Parameter set id segment.
    pub fn params_id(&self) -> &str {
        &self.params_id
    }

    /// Data id segment.
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    /// Directory of the record relative to a logs root.
    pub fn rel_path(&self) -> PathBuf {
        PathBuf::from(&self.arch)
            .join(&self.exp_type)
            .join(&self.params_id)
            .join(&self.data_id)
    }
}

impl fmt::Display for ExpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.arch, self.exp_type, self.params_id, self.data_id
        )
    }
}

/// Identity of one run of an experiment: workspace commit plus board type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId {
    commit: String,
    board: String,
}

impl RunId {
    /// Builds a run identity from a workspace commit hash and a board type.
    pub fn new(commit: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            board: board.into(),
        }
    }

    /// Parses a run identity of the form `{commit}.{board}`.
    ///
    /// Commit hashes never contain a dot, so the first dot splits the two
    /// parts; the board name may contain further dots.
    pub fn parse(raw: &str) -> Result<Self, EmxError> {
        match raw.split_once('.') {
            Some((commit, board)) if !commit.is_empty() && !board.is_empty() => {
                Ok(Self::new(commit, board))
            }
            _ => Err(EmxError::MalformedInput(
                ErrorInfo::new("id.run_id", "run id must be {commit}.{board}")
                    .with_context("id", raw),
            )),
        }
    }

    /// Commit hash of the build workspace the run executed against.
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Board type the run executed on.
    pub fn board(&self) -> &str {
        &self.board
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.commit, self.board)
    }
}
