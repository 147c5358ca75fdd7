use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use emx_core::EmxError;

use crate::experiment::io_error;

/// Report of what a [`ResultStore::write`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every output already existed on disk with identical bytes.
    Matched,
    /// Outputs were written; at least one was absent or differed beforehand.
    Written,
    /// A persisted file differed and `force` was not set; nothing was written.
    Rejected,
}

/// Byte exact compare-and-write of run artifacts into one run directory.
///
/// Results are immutable evidence once recorded: a batch that disagrees
/// with persisted bytes is rejected wholesale unless forced, so a run can
/// never silently overwrite what an earlier run observed.
#[derive(Debug, Clone)]
pub struct ResultStore {
    run_dir: PathBuf,
}

impl ResultStore {
    /// Creates a store rooted at the given run directory.
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    /// Persists `outputs` into the run directory.
    ///
    /// The whole batch is compared against disk before anything is written.
    /// A persisted file with differing bytes rejects the batch unless
    /// `force` is set; absent files are simply written. The outcome reports
    /// whether everything already matched beforehand.
    pub fn write(
        &self,
        outputs: &[(String, Vec<u8>)],
        force: bool,
    ) -> Result<WriteOutcome, EmxError> {
        fs::create_dir_all(&self.run_dir)
            .map_err(|err| io_error("db.run_dir_create", &self.run_dir, err))?;
        let mut matched = true;
        for (name, bytes) in outputs {
            let path = self.run_dir.join(name);
            if !path.is_file() {
                matched = false;
                continue;
            }
            let existing =
                fs::read(&path).map_err(|err| io_error("db.result_read", &path, err))?;
            if existing != *bytes {
                if !force {
                    return Ok(WriteOutcome::Rejected);
                }
                matched = false;
            }
        }
        for (name, bytes) in outputs {
            write_atomic(&self.run_dir.join(name), bytes)?;
        }
        Ok(if matched {
            WriteOutcome::Matched
        } else {
            WriteOutcome::Written
        })
    }
}

// The rename is the commit point; readers never observe a partially written
// artifact under the final name.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EmxError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp.{}", name, std::process::id()));
    let mut file =
        fs::File::create(&tmp).map_err(|err| io_error("db.result_write", &tmp, err))?;
    file.write_all(bytes)
        .map_err(|err| io_error("db.result_write", &tmp, err))?;
    file.sync_all()
        .map_err(|err| io_error("db.result_write", &tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| io_error("db.result_write", path, err))?;
    Ok(())
}
