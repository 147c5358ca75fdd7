use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use emx_core::{EmxError, ErrorInfo, ExpId, RunId};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::results::ResultStore;

/// File holding the content id of the linked program.
pub const CODE_HASH_FILE: &str = "code.hash";
/// Program source artifact inside a program directory.
pub const CODE_ASM_FILE: &str = "code.asm";
/// First input document of a record.
pub const INPUT1_FILE: &str = "input1.json";
/// Second input document, required for dual input experiment types.
pub const INPUT2_FILE: &str = "input2.json";
/// Raw device capture inside a run directory.
pub const OUTPUT_LOG_FILE: &str = "output_uart.log";
/// Structured result document inside a run directory.
pub const RESULT_FILE: &str = "result.json";

const RUN_PREFIX: &str = "run.";
const GEN_PREFIX: &str = "gen.";
const PROGS_DIR: &str = "progs";
const DUAL_INPUT_TYPE: &str = "exps2";

/// Handle to a logs root directory holding experiment records.
#[derive(Debug, Clone)]
pub struct LogsDb {
    root: PathBuf,
}

impl LogsDb {
    /// Opens an existing logs root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, EmxError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(EmxError::NotFound(
                ErrorInfo::new("db.root_missing", "logs root is not a directory").with_path(&root),
            ));
        }
        Ok(Self { root })
    }

    /// Root directory of the database.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens the record for `id`, failing when its directory is absent.
    pub fn experiment(&self, id: &ExpId) -> Result<Experiment, EmxError> {
        let dir = self.root.join(id.rel_path());
        if !dir.is_dir() {
            return Err(EmxError::NotFound(
                ErrorInfo::new("db.experiment_missing", "experiment directory does not exist")
                    .with_path(&dir)
                    .with_context("id", id.to_string()),
            ));
        }
        Ok(Experiment {
            root: self.root.clone(),
            id: id.clone(),
            dir,
        })
    }

    /// Parses `raw` as an identity and opens the corresponding record.
    pub fn open_experiment(&self, raw: &str) -> Result<Experiment, EmxError> {
        let id = ExpId::parse(raw)?;
        self.experiment(&id)
    }

    /// Creates a new record, writing each `(filename, bytes)` pair verbatim.
    pub fn create_experiment(
        &self,
        id: &ExpId,
        files: &[(String, Vec<u8>)],
    ) -> Result<Experiment, EmxError> {
        let dir = self.root.join(id.rel_path());
        if dir.exists() {
            return Err(EmxError::AlreadyExists(
                ErrorInfo::new("db.experiment_exists", "experiment directory already exists")
                    .with_path(&dir)
                    .with_context("id", id.to_string()),
            ));
        }
        fs::create_dir_all(&dir).map_err(|err| io_error("db.create_dir", &dir, err))?;
        for (name, bytes) in files {
            let path = dir.join(name);
            fs::write(&path, bytes).map_err(|err| io_error("db.create_write", &path, err))?;
        }
        Ok(Experiment {
            root: self.root.clone(),
            id: id.clone(),
            dir,
        })
    }

    /// Enumerates every experiment identity found under the root, sorted.
    ///
    /// Program storage under `{arch}/progs` is skipped; any other directory
    /// nested exactly four levels deep is reported as an identity.
    pub fn experiment_ids(&self) -> Result<Vec<ExpId>, EmxError> {
        let mut ids = BTreeSet::new();
        for entry in WalkDir::new(&self.root).min_depth(4).max_depth(4) {
            let entry = entry.map_err(|err| {
                EmxError::Io(ErrorInfo::new("db.walk", err.to_string()).with_path(&self.root))
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let segments: Vec<String> = rel
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect();
            if segments.len() != 4 || segments[1] == PROGS_DIR {
                continue;
            }
            if let Ok(id) = ExpId::parse(&segments.join("/")) {
                ids.insert(id);
            }
        }
        Ok(ids.into_iter().collect())
    }
}

/// One experiment record rooted in its identity directory.
#[derive(Debug, Clone)]
pub struct Experiment {
    root: PathBuf,
    id: ExpId,
    dir: PathBuf,
}

impl Experiment {
    /// Identity of the record.
    pub fn id(&self) -> &ExpId {
        &self.id
    }

    /// Directory backing the record.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn progs_dir(&self) -> PathBuf {
        self.root.join(self.id.arch()).join(PROGS_DIR)
    }

    /// Reads the linked program id from `code.hash`, trimmed of whitespace.
    pub fn prog_id(&self) -> Result<String, EmxError> {
        let path = self.dir.join(CODE_HASH_FILE);
        let raw = read_text(&path, "db.code_hash_missing")?;
        Ok(raw.trim().to_string())
    }

    /// Reads the linked program's assembly source.
    pub fn code(&self) -> Result<String, EmxError> {
        let prog_id = self.prog_id()?;
        let path = self.progs_dir().join(&prog_id).join(CODE_ASM_FILE);
        read_text(&path, "db.code_asm_missing")
    }

    /// Parses the named file of the record as a JSON mapping.
    pub fn input(&self, name: &str) -> Result<Map<String, Value>, EmxError> {
        read_json_object(&self.dir.join(name))
    }

    /// Parses the named file inside `run_id`'s directory as JSON.
    pub fn result(&self, run_id: &RunId, name: &str) -> Result<Value, EmxError> {
        read_json(&self.run_dir(run_id).join(name))
    }

    /// Generation marker filenames (`gen.*`) in the record directory.
    pub fn generations(&self) -> Result<BTreeSet<String>, EmxError> {
        list_prefixed(&self.dir, GEN_PREFIX, false)
    }

    /// Generation marker filenames in the linked program directory.
    pub fn prog_generations(&self) -> Result<BTreeSet<String>, EmxError> {
        let prog_id = self.prog_id()?;
        list_prefixed(&self.progs_dir().join(&prog_id), GEN_PREFIX, false)
    }

    /// Run identities recorded below the record, as `run.` suffixes.
    pub fn run_ids(&self) -> Result<BTreeSet<String>, EmxError> {
        list_prefixed(&self.dir, RUN_PREFIX, true)
    }

    /// Directory of the given run below the record.
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.dir.join(format!("{RUN_PREFIX}{run_id}"))
    }

    /// True when both run artifacts exist for `run_id`.
    pub fn run_is_complete(&self, run_id: &RunId) -> bool {
        let dir = self.run_dir(run_id);
        dir.join(OUTPUT_LOG_FILE).is_file() && dir.join(RESULT_FILE).is_file()
    }

    /// Raw text of the result document for `run_id`.
    ///
    /// The document is free form and only ever inspected as text, so bytes
    /// are decoded lossily.
    pub fn result_text(&self, run_id: &RunId) -> Result<String, EmxError> {
        let path = self.run_dir(run_id).join(RESULT_FILE);
        if !path.is_file() {
            return Err(EmxError::MissingFile(
                ErrorInfo::new("db.result_missing", "result document does not exist")
                    .with_path(&path),
            ));
        }
        let bytes = fs::read(&path).map_err(|err| io_error("db.result_read", &path, err))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Removes the run directory wholesale. Absent directories are a no-op.
    pub fn remove_run(&self, run_id: &RunId) -> Result<(), EmxError> {
        let dir = self.run_dir(run_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|err| io_error("db.run_remove", &dir, err))?;
        }
        Ok(())
    }

    /// Store handle for persisting the artifacts of `run_id`.
    pub fn result_store(&self, run_id: &RunId) -> ResultStore {
        ResultStore::new(self.run_dir(run_id))
    }

    /// Checks whether the record carries everything a run needs.
    ///
    /// Required: a readable `code.hash`, a parseable `input1.json` mapping,
    /// `input2.json` as well for `exps2` records, and the linked program's
    /// `code.asm`. Missing or malformed content yields `false`, never an
    /// error.
    pub fn is_valid(&self) -> bool {
        let prog_id = match self.prog_id() {
            Ok(prog_id) => prog_id,
            Err(_) => return false,
        };
        if self.input(INPUT1_FILE).is_err() {
            return false;
        }
        if self.id.exp_type() == DUAL_INPUT_TYPE && self.input(INPUT2_FILE).is_err() {
            return false;
        }
        self.progs_dir().join(&prog_id).join(CODE_ASM_FILE).is_file()
    }
}

pub(crate) fn io_error(code: &str, path: &Path, err: io::Error) -> EmxError {
    EmxError::Io(ErrorInfo::new(code, err.to_string()).with_path(path))
}

fn read_text(path: &Path, missing_code: &str) -> Result<String, EmxError> {
    if !path.is_file() {
        return Err(EmxError::MissingFile(
            ErrorInfo::new(missing_code, "required file does not exist").with_path(path),
        ));
    }
    fs::read_to_string(path).map_err(|err| io_error("db.read", path, err))
}

fn read_json(path: &Path) -> Result<Value, EmxError> {
    if !path.is_file() {
        return Err(EmxError::MissingFile(
            ErrorInfo::new("db.document_missing", "document does not exist").with_path(path),
        ));
    }
    let bytes = fs::read(path).map_err(|err| io_error("db.read", path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| {
        EmxError::MalformedInput(
            ErrorInfo::new("db.document_parse", "document is not valid JSON")
                .with_path(path)
                .with_context("error", err.to_string()),
        )
    })
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>, EmxError> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(EmxError::MalformedInput(
            ErrorInfo::new("db.document_shape", "document is not a JSON mapping").with_path(path),
        )),
    }
}

fn list_prefixed(dir: &Path, prefix: &str, strip: bool) -> Result<BTreeSet<String>, EmxError> {
    let mut names = BTreeSet::new();
    let entries = fs::read_dir(dir).map_err(|err| io_error("db.read_dir", dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| io_error("db.read_dir", dir, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(suffix) = name.strip_prefix(prefix) {
            names.insert(if strip {
                suffix.to_string()
            } else {
                name.clone()
            });
        }
    }
    Ok(names)
}
