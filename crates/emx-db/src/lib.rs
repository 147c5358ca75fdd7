//! Filesystem backed experiment log database.
//!
//! The database root holds experiment records keyed by their four segment
//! identity, program artifacts under `{arch}/progs/{prog_id}`, and one
//! `run.{commit}.{board}` directory per recorded run inside each record.
//! Everything is plain files; the directory layout is the schema.

mod experiment;
mod results;
mod retry;

pub use experiment::{
    Experiment, LogsDb, CODE_ASM_FILE, CODE_HASH_FILE, INPUT1_FILE, INPUT2_FILE, OUTPUT_LOG_FILE,
    RESULT_FILE,
};
pub use results::{ResultStore, WriteOutcome};
pub use retry::{RetryPolicy, RetryState};
