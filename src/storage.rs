use crate::model::ScheduleEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fixed key naming the slot that holds edited state.
pub const STATE_KEY: &str = "schedule_edits";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PersistedState {
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub entries: Vec<ScheduleEntry>,
}

/// Durable slot for the edited schedule.
///
/// `load` never fails: a missing or unreadable slot is reported as `None`.
pub trait StateStore {
    fn load(&self) -> Option<PersistedState>;
    fn save(&mut self, entries: &[ScheduleEntry]) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Store under the platform data directory.
    pub fn in_data_dir() -> Result<Self> {
        Ok(FileStore::new(default_state_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Option<PersistedState> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "could not read saved schedule");
                return None;
            }
        };
        decode_state(&data)
    }

    fn save(&mut self, entries: &[ScheduleEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = encode_state(entries)?;
        fs::write(&self.path, serialized).with_context(|| format!("writing {:?}", self.path))?;
        info!(entries = entries.len(), path = %self.path.display(), "saved schedule edits");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared saved schedule edits");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {:?}", self.path)),
        }
    }
}

pub fn encode_state(entries: &[ScheduleEntry]) -> Result<String> {
    let state = PersistedState {
        saved_at: Some(Utc::now()),
        entries: entries.to_vec(),
    };
    serde_yaml::to_string(&state).context("serializing schedule state")
}

/// Decodes a stored document, treating anything undecodable as no saved state.
pub fn decode_state(data: &str) -> Option<PersistedState> {
    match serde_yaml::from_str::<PersistedState>(data) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(error = %err, "saved schedule is invalid, ignoring it");
            None
        }
    }
}

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "timetable").context("locating data directory")
}

fn default_state_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.data_dir().join(format!("{}.yml", STATE_KEY)))
}

#[cfg(test)]
pub mod memory {
    use super::*;

    /// Store that keeps the encoded document in memory.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        pub slot: Option<String>,
        pub saves: usize,
    }

    impl MemoryStore {
        pub fn with_raw(raw: &str) -> Self {
            MemoryStore {
                slot: Some(raw.to_string()),
                saves: 0,
            }
        }
    }

    impl StateStore for MemoryStore {
        fn load(&self) -> Option<PersistedState> {
            self.slot.as_deref().and_then(decode_state)
        }

        fn save(&mut self, entries: &[ScheduleEntry]) -> Result<()> {
            self.slot = Some(encode_state(entries)?);
            self.saves += 1;
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.slot = None;
            Ok(())
        }
    }
}
