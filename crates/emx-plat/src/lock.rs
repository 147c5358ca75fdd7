use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use emx_core::{EmxError, ErrorInfo};

const LOCK_FILE: &str = "emx-workspace.lock";

/// Scoped serialization of the clean-to-execute cycle of one workspace.
///
/// Acquisition creates a lock file under the checkout's `.git` directory,
/// where neither the clean check nor ignored-file cleanup can see it. The
/// file is removed when the guard drops; a second acquisition against the
/// same checkout fails with the precondition family while the first guard
/// lives.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquires the lock for the workspace rooted at `root`.
    pub fn acquire(root: &Path) -> Result<Self, EmxError> {
        let path = root.join(".git").join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "pid: {}", std::process::id());
                Ok(Self { path })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(EmxError::Precondition(
                    ErrorInfo::new("plat.workspace_locked", "workspace is locked by another run")
                        .with_path(&path)
                        .with_hint("wait for the other run or remove a stale lock file"),
                ))
            }
            Err(err) => Err(EmxError::Io(
                ErrorInfo::new("plat.lock_io", err.to_string()).with_path(&path),
            )),
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
