use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Duration;

use emx_core::{EmxError, ErrorInfo};
use tracing::info;

use crate::command::run_captured;

/// Environment variable naming the platform workspace root.
pub const PLATFORM_DIR_ENV: &str = "EMX_PLATFORM_DIR";

/// Workspace relative directory experiment files are injected into.
pub const INJECT_DIR: &str = "inc/experiment";
/// Workspace relative path of the raw device capture after a run.
const DEVICE_LOG: &str = "temp/uart.log";

const STDERR_EXCERPT_CHARS: usize = 400;

/// Lifecycle of the build workspace between clean checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// Nothing is known about the working tree yet.
    Unknown,
    /// The working tree passed a clean check and may be mutated.
    Clean,
    /// A branch switch happened since the clean check.
    BranchSwitched,
    /// Experiment files were injected since the clean check.
    FileInjected,
    /// A build ran; a fresh clean check is required before further mutation.
    Executed,
}

impl WorkspaceState {
    /// True while mutations and execution are permitted.
    pub fn writable(&self) -> bool {
        matches!(
            self,
            WorkspaceState::Clean | WorkspaceState::BranchSwitched | WorkspaceState::FileInjected
        )
    }
}

/// Board connection mode of a run, selecting the Makefile target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Connect to the board if needed, reusing an existing connection.
    #[default]
    Try,
    /// Assume an established board connection.
    Run,
    /// Reset the board connection before running.
    Reset,
}

impl ExecMode {
    fn target(&self) -> &'static str {
        match self {
            ExecMode::Try => "runlog_try",
            ExecMode::Run => "runlog",
            ExecMode::Reset => "runlog_reset",
        }
    }
}

/// Handle to the git tracked build workspace shared by all runs.
///
/// The handle serializes nothing across processes by itself; wrap the
/// clean-to-execute cycle in a [`crate::WorkspaceLock`] when several
/// processes may target the same checkout.
#[derive(Debug)]
pub struct BuildWorkspace {
    root: PathBuf,
    state: WorkspaceState,
    timeout: Option<Duration>,
}

impl BuildWorkspace {
    /// Opens the workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EmxError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(EmxError::NotFound(
                ErrorInfo::new("plat.root_missing", "platform workspace is not a directory")
                    .with_path(&root),
            ));
        }
        info!(root = %root.display(), "using platform workspace");
        Ok(Self {
            root,
            state: WorkspaceState::Unknown,
            timeout: None,
        })
    }

    /// Opens the workspace from an explicit path, falling back to
    /// [`PLATFORM_DIR_ENV`] when no path is given.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, EmxError> {
        match explicit {
            Some(path) => Self::new(path),
            None => match env::var(PLATFORM_DIR_ENV) {
                Ok(value) if !value.is_empty() => Self::new(PathBuf::from(value)),
                _ => Err(EmxError::NotFound(
                    ErrorInfo::new("plat.root_unset", "no platform workspace configured")
                        .with_hint(format!("pass an explicit path or set {PLATFORM_DIR_ENV}")),
                )),
            },
        }
    }

    /// Applies a deadline to every git and make invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Root directory of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Resolves `HEAD` to its commit hash.
    pub fn commit_hash(&self) -> Result<String, EmxError> {
        self.rev_parse("HEAD")
    }

    /// Resolves a branch name to its commit hash.
    pub fn branch_commit_hash(&self, branch: &str) -> Result<String, EmxError> {
        self.rev_parse(branch)
    }

    /// Verifies the working tree is clean, granting write permission.
    ///
    /// With `force_cleanup` set, tracked files are restored and ignored
    /// build products removed first. A dirty tree (or a failing git call)
    /// leaves the workspace non writable.
    pub fn check_clean(&mut self, force_cleanup: bool) -> Result<(), EmxError> {
        self.state = WorkspaceState::Unknown;
        let root = self.root.display().to_string();
        if force_cleanup {
            info!("forcing cleanup of the working tree");
            self.run_git(
                &["checkout", "--", &root],
                "plat.restore",
                "could not restore tracked files",
            )?;
            self.run_git(
                &["clean", "-fdX", &root],
                "plat.clean",
                "could not remove ignored files",
            )?;
        }
        info!("checking whether the working tree is clean");
        let stdout = self.run_git(
            &["status", "--porcelain"],
            "plat.status",
            "could not read working tree status",
        )?;
        if !stdout.is_empty() {
            return Err(EmxError::DirtyWorkspace(
                ErrorInfo::new("plat.dirty", "working tree has local modifications")
                    .with_path(&self.root)
                    .with_hint("commit and push your changes or clean the checkout"),
            ));
        }
        self.state = WorkspaceState::Clean;
        Ok(())
    }

    /// Checks out `branch` and removes ignored files left by other branches.
    pub fn change_branch(&mut self, branch: &str) -> Result<(), EmxError> {
        self.require_writable("change_branch")?;
        info!(branch, "switching workspace branch");
        let root = self.root.display().to_string();
        let result = self
            .run_git(
                &["checkout", branch],
                "plat.checkout",
                &format!("could not checkout branch {branch}"),
            )
            .and_then(|_| {
                self.run_git(
                    &["clean", "-fdX", &root],
                    "plat.clean",
                    "could not remove ignored files",
                )
            });
        match result {
            Ok(_) => {
                self.state = WorkspaceState::BranchSwitched;
                Ok(())
            }
            Err(err) => {
                self.state = WorkspaceState::Unknown;
                Err(err)
            }
        }
    }

    /// Writes an experiment file into the injection directory.
    pub fn write_injected_file(&mut self, filename: &str, contents: &[u8]) -> Result<(), EmxError> {
        self.require_writable("write_injected_file")?;
        let path = self.root.join(INJECT_DIR).join(filename);
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        let written = fs::create_dir_all(&parent).and_then(|_| fs::write(&path, contents));
        match written {
            Ok(_) => {
                self.state = WorkspaceState::FileInjected;
                Ok(())
            }
            Err(err) => {
                self.state = WorkspaceState::Unknown;
                Err(EmxError::Io(
                    ErrorInfo::new("plat.inject_write", err.to_string()).with_path(&path),
                ))
            }
        }
    }

    /// Runs the Makefile target for `mode` and returns the raw device
    /// capture.
    ///
    /// Execution consumes writability regardless of outcome; a fresh clean
    /// check is required before the next cycle.
    pub fn execute(&mut self, mode: ExecMode) -> Result<Vec<u8>, EmxError> {
        self.require_writable("execute")?;
        self.state = WorkspaceState::Executed;
        let target = mode.target();
        info!(target, "invoking platform build");
        let mut command = Command::new("make");
        command.arg("-C").arg(&self.root).arg(target);
        let output = run_captured(command, self.timeout).map_err(|err| {
            EmxError::Execution(
                ErrorInfo::new("plat.make", "could not invoke make")
                    .with_path(&self.root)
                    .with_context("target", target)
                    .with_context("error", err.to_string()),
            )
        })?;
        if !output.status.success() {
            return Err(EmxError::Execution(
                ErrorInfo::new("plat.run_failed", "platform run did not succeed")
                    .with_path(&self.root)
                    .with_context("target", target)
                    .with_context("status", exit_label(&output.status))
                    .with_context("stderr", tail_lossy(&output.stderr)),
            ));
        }
        let log_path = self.root.join(DEVICE_LOG);
        if !log_path.is_file() {
            return Err(EmxError::MissingFile(
                ErrorInfo::new("plat.device_log_missing", "run produced no device log")
                    .with_path(&log_path),
            ));
        }
        fs::read(&log_path).map_err(|err| {
            EmxError::Io(
                ErrorInfo::new("plat.device_log_read", err.to_string()).with_path(&log_path),
            )
        })
    }

    fn require_writable(&self, operation: &str) -> Result<(), EmxError> {
        if self.state.writable() {
            return Ok(());
        }
        Err(EmxError::Precondition(
            ErrorInfo::new("plat.not_writable", "workspace is not writable")
                .with_path(&self.root)
                .with_context("operation", operation)
                .with_context("state", format!("{:?}", self.state))
                .with_hint("run a clean check first"),
        ))
    }

    fn rev_parse(&self, reference: &str) -> Result<String, EmxError> {
        let stdout = self.run_git(
            &["rev-parse", reference],
            "plat.rev_parse",
            &format!("could not resolve revision {reference}"),
        )?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    fn git_command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command
            .arg("--git-dir")
            .arg(self.root.join(".git"))
            .arg("--work-tree")
            .arg(&self.root)
            .args(args);
        command
    }

    fn run_git(&self, args: &[&str], code: &str, message: &str) -> Result<Vec<u8>, EmxError> {
        let output = run_captured(self.git_command(args), self.timeout).map_err(|err| {
            EmxError::Git(
                ErrorInfo::new(code, message)
                    .with_path(&self.root)
                    .with_context("error", err.to_string()),
            )
        })?;
        if !output.status.success() {
            return Err(EmxError::Git(
                ErrorInfo::new(code, message)
                    .with_path(&self.root)
                    .with_context("status", exit_label(&output.status))
                    .with_context("stderr", tail_lossy(&output.stderr)),
            ));
        }
        Ok(output.stdout)
    }
}

fn exit_label(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn tail_lossy(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth_back(STDERR_EXCERPT_CHARS - 1) {
        Some((index, _)) => text[index..].to_string(),
        None => text.to_string(),
    }
}
