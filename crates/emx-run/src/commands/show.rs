use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use emx_core::RunId;
use emx_db::{LogsDb, INPUT1_FILE, INPUT2_FILE};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Experiment identity `{arch}/{type}/{params}/{data}`.
    pub id: String,

    /// Logs root holding the experiment records.
    #[arg(long)]
    pub logs: PathBuf,
}

pub fn run(args: &ShowArgs) -> Result<(), Box<dyn Error>> {
    let db = LogsDb::open(&args.logs)?;
    let experiment = db.open_experiment(&args.id)?;
    let separator = "=".repeat(20);

    println!("prog_id = {}", experiment.prog_id()?);
    println!("{separator}");
    println!("{}", experiment.code()?.trim_end());
    println!("{separator}");
    println!(
        "{}",
        serde_json::to_string_pretty(&experiment.input(INPUT1_FILE)?)?
    );
    if experiment.dir().join(INPUT2_FILE).is_file() {
        println!("{separator}");
        println!(
            "{}",
            serde_json::to_string_pretty(&experiment.input(INPUT2_FILE)?)?
        );
    }
    println!("{separator}");

    let runs = experiment.run_ids()?;
    if runs.is_empty() {
        println!("no recorded runs");
    } else {
        for suffix in runs {
            match RunId::parse(&suffix) {
                Ok(run_id) => {
                    let marker = if experiment.run_is_complete(&run_id) {
                        "complete"
                    } else {
                        "incomplete"
                    };
                    println!("run {suffix} [{marker}]");
                }
                Err(_) => println!("run {suffix}"),
            }
        }
    }
    Ok(())
}
