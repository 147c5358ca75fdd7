use emx_core::{EmxError, ErrorInfo, RunId};
use tracing::{info, warn};

use crate::experiment::Experiment;

/// Marker whose presence in a result document denotes a failed device run.
const EXCEPTION_MARKER: &str = "exception";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lifecycle of the retry cycle for one run identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No run has been attempted yet.
    Pending,
    /// Runs were attempted; the counter is the number of recorded results
    /// that carried the exception marker so far.
    Attempted(u32),
    /// The exception bound was reached; the last result stands as final.
    Failed,
    /// A run completed without an exception marker.
    Succeeded,
}

/// Bounded exception driven retry decisions for one experiment record.
///
/// The policy tracks the most recently attempted run identity and how many
/// of its recorded results carried the exception marker. A retry is
/// expressed destructively: the offending run directory is removed so the
/// caller re-executes from scratch. At the bound the exceptional result is
/// accepted as final instead of being deleted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    state: RetryState,
    last_attempted: Option<RunId>,
}

impl RetryPolicy {
    /// Creates a policy with the default exception bound of three.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            state: RetryState::Pending,
            last_attempted: None,
        }
    }

    /// Overrides the exception bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Registers that the caller executed `run_id`.
    ///
    /// Switching to a different run identity restarts the cycle.
    pub fn record_attempt(&mut self, run_id: &RunId) {
        if self.last_attempted.as_ref() != Some(run_id) {
            self.last_attempted = Some(run_id.clone());
            self.state = RetryState::Attempted(0);
        }
    }

    /// Decides whether `run_id` still needs to be executed.
    ///
    /// A run is complete when both of its artifacts exist. A complete run
    /// whose recorded result (read from the most recently attempted
    /// identity) carries the exception marker is removed and reported
    /// incomplete until the bound is reached.
    ///
    /// Querying before any [`RetryPolicy::record_attempt`] is a caller bug
    /// and fails with the precondition family.
    pub fn is_incomplete(
        &mut self,
        experiment: &Experiment,
        run_id: &RunId,
    ) -> Result<bool, EmxError> {
        let last = match &self.last_attempted {
            Some(last) => last.clone(),
            None => {
                return Err(EmxError::Precondition(ErrorInfo::new(
                    "db.retry_no_attempt",
                    "retry policy queried before any run was attempted",
                )));
            }
        };
        let complete = experiment.run_is_complete(run_id);
        if matches!(self.state, RetryState::Failed | RetryState::Succeeded) {
            return Ok(!complete);
        }
        if !complete {
            return Ok(true);
        }
        let text = experiment.result_text(&last)?;
        if !text.contains(EXCEPTION_MARKER) {
            self.state = RetryState::Succeeded;
            return Ok(false);
        }
        let prior = match self.state {
            RetryState::Attempted(count) => count,
            _ => 0,
        };
        let attempts = prior + 1;
        if attempts < self.max_attempts {
            self.state = RetryState::Attempted(attempts);
            experiment.remove_run(&last)?;
            info!(run = %last, attempts, "result carries an exception marker, scheduling re-run");
            return Ok(true);
        }
        self.state = RetryState::Failed;
        warn!(run = %last, attempts, "exception bound reached, accepting result as final");
        Ok(false)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
