use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use emx_core::ExpId;
use emx_db::{LogsDb, CODE_HASH_FILE, INPUT1_FILE, INPUT2_FILE};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Experiment identity `{arch}/{type}/{params}/{data}`.
    pub id: String,

    /// Logs root holding the experiment records.
    #[arg(long)]
    pub logs: PathBuf,

    /// Content id of the linked program.
    #[arg(long)]
    pub code_hash: String,

    /// Path to the first input document.
    #[arg(long)]
    pub input1: PathBuf,

    /// Path to the second input document (dual input experiment types).
    #[arg(long)]
    pub input2: Option<PathBuf>,
}

pub fn run(args: &CreateArgs) -> Result<(), Box<dyn Error>> {
    let id = ExpId::parse(&args.id)?;
    let db = LogsDb::open(&args.logs)?;

    let mut files = vec![
        (
            CODE_HASH_FILE.to_string(),
            format!("{}\n", args.code_hash.trim()).into_bytes(),
        ),
        (INPUT1_FILE.to_string(), fs::read(&args.input1)?),
    ];
    if let Some(input2) = &args.input2 {
        files.push((INPUT2_FILE.to_string(), fs::read(input2)?));
    }

    let experiment = db.create_experiment(&id, &files)?;
    if experiment.is_valid() {
        println!("created {}", experiment.dir().display());
    } else {
        println!(
            "created {} (not yet valid: link the program artifact)",
            experiment.dir().display()
        );
    }
    Ok(())
}
