use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use emx_core::RunId;
use emx_db::{
    Experiment, LogsDb, RetryPolicy, RetryState, WriteOutcome, CODE_ASM_FILE, INPUT1_FILE,
    INPUT2_FILE, OUTPUT_LOG_FILE, RESULT_FILE,
};
use emx_plat::{BuildWorkspace, ExecMode, WorkspaceLock};
use serde_json::json;
use tracing::info;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Experiment identity `{arch}/{type}/{params}/{data}`.
    pub id: String,

    /// Logs root holding the experiment records.
    #[arg(long)]
    pub logs: PathBuf,

    /// Platform workspace root; defaults to $EMX_PLATFORM_DIR.
    #[arg(long)]
    pub platform: Option<PathBuf>,

    /// Board type the run targets, e.g. `rpi3`.
    #[arg(long)]
    pub board: String,

    /// Branch to execute on instead of the current HEAD.
    #[arg(long)]
    pub branch: Option<String>,

    /// Board connection mode, selecting the Makefile target.
    #[arg(long, value_enum, default_value = "try")]
    pub mode: ModeArg,

    /// Discard local modifications and ignored files before the clean check.
    #[arg(long)]
    pub force_cleanup: bool,

    /// Overwrite recorded results that differ from this run's output.
    #[arg(long)]
    pub force_results: bool,

    /// Execute even when the run is already recorded as complete.
    #[arg(long)]
    pub rerun: bool,

    /// Abort any git or make invocation after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Try,
    Run,
    Reset,
}

impl From<ModeArg> for ExecMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Try => ExecMode::Try,
            ModeArg::Run => ExecMode::Run,
            ModeArg::Reset => ExecMode::Reset,
        }
    }
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let db = LogsDb::open(&args.logs)?;
    let experiment = db.open_experiment(&args.id)?;
    if !experiment.is_valid() {
        return Err(format!(
            "experiment {} is missing required files or inputs",
            experiment.id()
        )
        .into());
    }

    let mut workspace = BuildWorkspace::discover(args.platform.as_deref())?;
    if let Some(secs) = args.timeout_secs {
        workspace = workspace.with_timeout(Duration::from_secs(secs));
    }
    let _lock = WorkspaceLock::acquire(workspace.root())?;

    let commit = match &args.branch {
        Some(branch) => workspace.branch_commit_hash(branch)?,
        None => workspace.commit_hash()?,
    };
    let run_id = RunId::new(commit, args.board.clone());
    info!(run = %run_id, experiment = %experiment.id(), "starting run");

    if !args.rerun && experiment.run_is_complete(&run_id) {
        println!("run {run_id} already recorded, nothing to do");
        return Ok(());
    }

    let code = experiment.code()?;
    let mut policy = RetryPolicy::new();
    loop {
        workspace.check_clean(args.force_cleanup)?;
        if let Some(branch) = &args.branch {
            workspace.change_branch(branch)?;
        }
        inject(&mut workspace, &experiment, &code)?;
        let capture = workspace.execute(args.mode.into())?;
        persist(&experiment, &run_id, capture, args.force_results)?;
        policy.record_attempt(&run_id);
        if !policy.is_incomplete(&experiment, &run_id)? {
            break;
        }
        info!(run = %run_id, "re-running after an exceptional result");
    }

    match policy.state() {
        RetryState::Succeeded => {
            println!("run {run_id} recorded");
            Ok(())
        }
        _ => Err(format!(
            "run {run_id} still signals an exception after repeated attempts; the last result is recorded as final"
        )
        .into()),
    }
}

fn inject(
    workspace: &mut BuildWorkspace,
    experiment: &Experiment,
    code: &str,
) -> Result<(), Box<dyn Error>> {
    workspace.write_injected_file(CODE_ASM_FILE, code.as_bytes())?;
    let input1 = fs::read(experiment.dir().join(INPUT1_FILE))?;
    workspace.write_injected_file(INPUT1_FILE, &input1)?;
    let input2_path = experiment.dir().join(INPUT2_FILE);
    if input2_path.is_file() {
        let input2 = fs::read(input2_path)?;
        workspace.write_injected_file(INPUT2_FILE, &input2)?;
    }
    Ok(())
}

fn persist(
    experiment: &Experiment,
    run_id: &RunId,
    capture: Vec<u8>,
    force: bool,
) -> Result<(), Box<dyn Error>> {
    let text = String::from_utf8_lossy(&capture).into_owned();
    let result = serde_json::to_vec_pretty(&json!({ "output": text }))?;
    let outputs = vec![
        (OUTPUT_LOG_FILE.to_string(), capture),
        (RESULT_FILE.to_string(), result),
    ];
    match experiment.result_store(run_id).write(&outputs, force)? {
        WriteOutcome::Matched => info!(run = %run_id, "results match the recorded bytes"),
        WriteOutcome::Written => info!(run = %run_id, "results written"),
        WriteOutcome::Rejected => {
            return Err(format!(
                "recorded results for {run_id} differ from this run; pass --force-results to overwrite"
            )
            .into());
        }
    }
    Ok(())
}
