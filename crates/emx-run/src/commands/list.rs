use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use emx_db::LogsDb;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Logs root holding the experiment records.
    #[arg(long)]
    pub logs: PathBuf,

    /// Also probe each record's validity.
    #[arg(long)]
    pub check: bool,
}

pub fn run(args: &ListArgs) -> Result<(), Box<dyn Error>> {
    let db = LogsDb::open(&args.logs)?;
    for id in db.experiment_ids()? {
        if args.check {
            let status = match db.experiment(&id) {
                Ok(experiment) if experiment.is_valid() => "valid",
                _ => "invalid",
            };
            println!("{id}\t{status}");
        } else {
            println!("{id}");
        }
    }
    Ok(())
}
