use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Args;
use emx_db::LogsDb;
use emx_plat::{INJECT_DIR, PLATFORM_DIR_ENV};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Logs root holding the experiment records.
    #[arg(long)]
    pub logs: PathBuf,

    /// Platform workspace root; defaults to $EMX_PLATFORM_DIR.
    #[arg(long)]
    pub platform: Option<PathBuf>,

    /// Emit only the JSON report.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(args: &DoctorArgs) -> Result<(), Box<dyn Error>> {
    let report = diagnose(args);
    let rendered = serde_json::to_string_pretty(&report)?;
    if !args.quiet {
        println!("emx-run doctor status: {}", report.status);
    }
    println!("{rendered}");
    if report.status != "ok" {
        return Err("one or more checks failed".into());
    }
    Ok(())
}

fn diagnose(args: &DoctorArgs) -> DoctorReport {
    let mut checks = vec![check_logs(&args.logs)];
    let platform = match &args.platform {
        Some(path) => Some(path.clone()),
        None => std::env::var(PLATFORM_DIR_ENV).ok().map(PathBuf::from),
    };
    match platform {
        Some(root) => {
            checks.push(check_dir("platform root", &root));
            checks.push(check_dir("platform/.git", &root.join(".git")));
            checks.push(check_file("platform/Makefile", &root.join("Makefile")));
            checks.push(check_dir("platform/inc/experiment", &root.join(INJECT_DIR)));
        }
        None => checks.push(DoctorCheck {
            name: "platform root".to_string(),
            ok: false,
            detail: format!("set {PLATFORM_DIR_ENV} or pass --platform"),
        }),
    }
    let status = if checks.iter().all(|check| check.ok) {
        "ok"
    } else {
        "needs-attention"
    };
    DoctorReport {
        status: status.to_string(),
        checks,
    }
}

fn check_logs(path: &Path) -> DoctorCheck {
    match LogsDb::open(path) {
        Ok(db) => DoctorCheck {
            name: "logs root".to_string(),
            ok: true,
            detail: db.root().display().to_string(),
        },
        Err(err) => DoctorCheck {
            name: "logs root".to_string(),
            ok: false,
            detail: err.to_string(),
        },
    }
}

fn check_dir(name: &str, path: &Path) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        ok: path.is_dir(),
        detail: if path.is_dir() {
            path.display().to_string()
        } else {
            "missing".to_string()
        },
    }
}

fn check_file(name: &str, path: &Path) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        ok: path.is_file(),
        detail: if path.is_file() {
            path.display().to_string()
        } else {
            "missing".to_string()
        },
    }
}
