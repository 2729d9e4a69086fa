use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{ContinueRequest, ScanStep};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("checkpoint path has no file name: {0:?}")]
    InvalidPath(PathBuf),
    #[error("failed to parse checkpoint {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("failed to serialize checkpoint: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Caller-side record of how far a profile has been scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub platform: String,
    pub profile_ref: String,
    pub next_index: u64,
    pub consecutive_failures: u32,
    pub hits: u64,
    /// Calendar day that `hits_today` counts for.
    #[serde(default)]
    pub hit_day: Option<NaiveDate>,
    #[serde(default)]
    pub hits_today: u64,
}

impl Checkpoint {
    pub fn new(platform: impl Into<String>, profile_ref: impl Into<String>, next_index: u64) -> Self {
        Self {
            platform: platform.into(),
            profile_ref: profile_ref.into(),
            next_index,
            consecutive_failures: 0,
            hits: 0,
            hit_day: None,
            hits_today: 0,
        }
    }

    pub fn matches(&self, platform: &str, profile_ref: &str) -> bool {
        self.platform.eq_ignore_ascii_case(platform) && self.profile_ref == profile_ref
    }

    /// The request that continues from this checkpoint.
    pub fn to_request(&self) -> ContinueRequest {
        // Cursors beyond i64::MAX cannot be expressed on the wire either.
        let next_index = i64::try_from(self.next_index).unwrap_or(i64::MAX);
        ContinueRequest::new(self.profile_ref.clone(), next_index)
            .with_failures(self.consecutive_failures)
    }

    /// Hits recorded on `today`; counts from an earlier day do not carry over.
    pub fn hits_on(&self, today: NaiveDate) -> u64 {
        if self.hit_day == Some(today) {
            self.hits_today
        } else {
            0
        }
    }

    pub fn apply(&mut self, step: &ScanStep, today: NaiveDate) {
        self.next_index = step.outcome.next_index();
        self.consecutive_failures = step.state.consecutive_failures();
        if step.outcome.is_hit() {
            self.hits += 1;
            self.hits_today = self.hits_on(today) + 1;
            self.hit_day = Some(today);
        }
    }
}

/// A single RON checkpoint file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    writer: AtomicFileWriter,
    filename: String,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| PersistError::InvalidPath(path.clone()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            path,
            filename,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no checkpoint has been written yet.
    pub fn load(&self) -> Result<Option<Checkpoint>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        ron::from_str(&content)
            .map(Some)
            .map_err(|err| PersistError::Parse {
                path: self.path.clone(),
                reason: err.to_string(),
            })
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(checkpoint, pretty)
            .map_err(|err| PersistError::Serialize(err.to_string()))?;
        self.writer.write(&self.filename, &content)?;
        Ok(())
    }
}
