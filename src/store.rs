//! Persistence of solutions found during a solve session.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::DaySchedule;
use crate::facts::FactSet;

/// Everything recorded about one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub event: String,
    pub model: u64,
    pub start_time: DateTime<Local>,
    pub found_time: DateTime<Local>,
    pub compute_seconds: f64,
    pub distance_precision: i32,
    pub duration_precision: i32,
    pub optimal: bool,
    pub schedule: Vec<DaySchedule>,
    pub costs: BTreeMap<String, i64>,
    pub hash: String,
}

impl Solution {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(io::BufReader::new(file))?)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether every later write is bound to fail too.
    pub fn is_structural(&self) -> bool {
        matches!(self, StoreError::CreateDir { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Fixed(PathBuf),
    /// `<root>/<event>_<start time>`, resolved once the solve start is known.
    PerSession { root: PathBuf, event: String },
}

/// Writes solution documents (and optional fact dumps) into one directory.
#[derive(Debug, Clone)]
pub struct SolutionStore {
    location: Location,
    save_facts: bool,
}

impl SolutionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Fixed(dir.into()),
            save_facts: false,
        }
    }

    /// Store whose directory is named after the event and the solve start.
    pub fn per_session(root: impl Into<PathBuf>, event: impl Into<String>) -> Self {
        Self {
            location: Location::PerSession {
                root: root.into(),
                event: event.into(),
            },
            save_facts: false,
        }
    }

    /// Also write the model's facts as `<name>.lp`.
    pub fn with_fact_dump(mut self, save_facts: bool) -> Self {
        self.save_facts = save_facts;
        self
    }

    /// `<root>/<event>_<start time>`, with `:` replaced so the name is
    /// portable.
    pub fn session_dir(root: &Path, event: &str, start: &DateTime<Local>) -> PathBuf {
        let stamp = start.format("%Y-%m-%dT%H:%M:%S%.6f").to_string().replace(':', "_");
        root.join(format!("{}_{}", event, stamp))
    }

    /// Output directory for a session that started at `start`.
    pub fn dir_for(&self, start: &DateTime<Local>) -> PathBuf {
        match &self.location {
            Location::Fixed(dir) => dir.clone(),
            Location::PerSession { root, event } => Self::session_dir(root, event, start),
        }
    }

    pub fn ensure_dir(&self, start: &DateTime<Local>) -> Result<PathBuf, StoreError> {
        let dir = self.dir_for(start);
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Writes `<name>.json` and, if enabled, `<name>.lp`.
    ///
    /// Both files are staged under temporary names first. The fact dump is
    /// moved into place before the document, and the document only once the
    /// dump is in place, so a failed save never leaves a new document on disk.
    pub fn save(
        &self,
        name: &str,
        solution: &Solution,
        facts: &FactSet,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.ensure_dir(&solution.start_time)?;

        let body = serde_json::to_vec_pretty(solution)?;
        let document = Staged::write(dir.join(format!("{}.json", name)), &body)?;

        if self.save_facts {
            let dump = match Staged::write(
                dir.join(format!("{}.lp", name)),
                facts.to_program().as_bytes(),
            ) {
                Ok(dump) => dump,
                Err(err) => {
                    document.discard();
                    return Err(err);
                }
            };
            let dump_path = dump.dest.clone();
            if let Err(err) = dump.commit() {
                document.discard();
                return Err(err);
            }
            return match document.commit() {
                Ok(path) => Ok(path),
                Err(err) => {
                    let _ = fs::remove_file(&dump_path);
                    Err(err)
                }
            };
        }
        document.commit()
    }
}

/// A file written under a temporary name, not yet moved into place.
struct Staged {
    tmp: PathBuf,
    dest: PathBuf,
}

impl Staged {
    fn write(dest: PathBuf, bytes: &[u8]) -> Result<Self, StoreError> {
        let mut tmp = dest.clone().into_os_string();
        tmp.push(".tmp");
        let staged = Self {
            tmp: PathBuf::from(tmp),
            dest,
        };
        match staged.write_tmp(bytes) {
            Ok(()) => Ok(staged),
            Err(source) => {
                let err = StoreError::Write {
                    path: staged.dest.clone(),
                    source,
                };
                staged.discard();
                Err(err)
            }
        }
    }

    fn write_tmp(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&self.tmp)?);
        writer.write_all(bytes)?;
        writer.flush()
    }

    fn commit(self) -> Result<PathBuf, StoreError> {
        match fs::rename(&self.tmp, &self.dest) {
            Ok(()) => Ok(self.dest),
            Err(source) => {
                let err = StoreError::Write {
                    path: self.dest.clone(),
                    source,
                };
                self.discard();
                Err(err)
            }
        }
    }

    fn discard(self) {
        let _ = fs::remove_file(&self.tmp);
    }
}
