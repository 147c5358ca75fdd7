use std::error::Error;

use clap::{Parser, Subcommand};

mod commands;

use commands::{create, doctor, list, run, show};

#[derive(Parser, Debug)]
#[command(name = "emx-run", about = "Embedded experiment log and run driver", version)]
struct Cli {
    /// Enable debug level logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute an experiment on the platform workspace and record the result.
    Run(run::RunArgs),
    /// Create a new experiment record from a code hash and input documents.
    Create(create::CreateArgs),
    /// Print an experiment record: program, code listing, inputs and runs.
    Show(show::ShowArgs),
    /// List experiment identities under a logs root.
    List(list::ListArgs),
    /// Check the health of the logs root and the platform workspace.
    Doctor(doctor::DoctorArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Create(args) => create::run(&args),
        Command::Show(args) => show::run(&args),
        Command::List(args) => list::run(&args),
        Command::Doctor(args) => doctor::run(&args),
    }
}
