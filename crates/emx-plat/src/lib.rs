//! Driver for the version controlled build workspace that compiles
//! experiments and runs them on embedded boards.
//!
//! The workspace is a git checkout with a Makefile entry point. All
//! mutations are gated on an explicit clean check so that a run can always
//! be attributed to a commit hash.

mod command;
mod lock;
mod workspace;

pub use lock::WorkspaceLock;
pub use workspace::{BuildWorkspace, ExecMode, WorkspaceState, INJECT_DIR, PLATFORM_DIR_ENV};
