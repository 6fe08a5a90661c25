use crate::grid::GridLayout;
use crate::model::Interval;
use crate::storage::project_dirs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Keys the grid and editor claim for themselves.
pub const RESERVED_KEYS: &[char] = &['q', 'e', 'h', 'j', 'k', 'l'];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid needs at least one day")]
    NoDays,
    #[error("grid needs at least one interval")]
    NoIntervals,
    #[error("key '{0}' is reserved and cannot be bound to a control")]
    ReservedKey(char),
    #[error("key '{0}' is bound to more than one control")]
    DuplicateKey(char),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub source: PathBuf,
    pub days: Vec<String>,
    pub intervals: Vec<String>,
    pub export_dir: Option<PathBuf>,
    pub controls: Controls,
}

/// Optional key bindings for the export, restore and clear actions.
/// A `None` binding leaves that action unavailable in the grid view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Controls {
    pub export: Option<char>,
    pub restore: Option<char>,
    pub clear_local: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Export,
    Restore,
    ClearLocal,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: PathBuf::from("assets/timetable/timetable.csv"),
            days: ["Mon", "Tue", "Wed", "Thu", "Fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            intervals: (7..18)
                .map(|h| format!("{:02}:00-{:02}:00", h, h + 1))
                .collect(),
            export_dir: None,
            controls: Controls::default(),
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            export: Some('x'),
            restore: Some('r'),
            clear_local: Some('c'),
        }
    }
}

impl Config {
    /// Reads `path`, or the default location when `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let config = if path.exists() {
            let data =
                fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days.is_empty() {
            return Err(ConfigError::NoDays);
        }
        if self.intervals.is_empty() {
            return Err(ConfigError::NoIntervals);
        }
        self.controls.validate()
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(
            self.days.clone(),
            self.intervals.iter().map(Interval::from_key).collect(),
        )
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Controls {
    pub fn action_for(&self, key: char) -> Option<ControlAction> {
        self.bindings()
            .into_iter()
            .find_map(|(bound, action)| (bound == Some(key)).then_some(action))
    }

    pub fn key_for(&self, action: ControlAction) -> Option<char> {
        self.bindings()
            .into_iter()
            .find_map(|(bound, a)| if a == action { bound } else { None })
    }

    fn bindings(&self) -> [(Option<char>, ControlAction); 3] {
        [
            (self.export, ControlAction::Export),
            (self.restore, ControlAction::Restore),
            (self.clear_local, ControlAction::ClearLocal),
        ]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = Vec::new();
        for key in self.bindings().iter().filter_map(|(k, _)| *k) {
            if RESERVED_KEYS.contains(&key) {
                return Err(ConfigError::ReservedKey(key));
            }
            if seen.contains(&key) {
                return Err(ConfigError::DuplicateKey(key));
            }
            seen.push(key);
        }
        Ok(())
    }
}

impl ControlAction {
    pub fn label(&self) -> &'static str {
        match self {
            ControlAction::Export => "export",
            ControlAction::Restore => "restore original",
            ControlAction::ClearLocal => "clear local",
        }
    }
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_cover_a_school_week() {
        let config = Config::default();
        let layout = config.layout();
        assert_eq!(layout.days.len(), 5);
        assert_eq!(layout.intervals.first(), Some(&Interval::new("07:00", "08:00")));
        assert_eq!(layout.intervals.last(), Some(&Interval::new("17:00", "18:00")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.yml").as_path())).unwrap();
        assert_eq!(config.days, Config::default().days);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "days: [Seg, Ter]\ncontrols:\n  export: z\n  clear_local: null\n",
        )
        .unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.days, vec!["Seg", "Ter"]);
        assert_eq!(config.intervals.len(), 11);
        assert_eq!(config.controls.export, Some('z'));
        assert_eq!(config.controls.restore, Some('r'));
        assert_eq!(config.controls.clear_local, None);
    }

    #[test]
    fn unbound_control_has_no_action() {
        let controls = Controls {
            export: Some('x'),
            restore: None,
            clear_local: Some('c'),
        };
        assert_eq!(controls.action_for('x'), Some(ControlAction::Export));
        assert_eq!(controls.action_for('r'), None);
        assert_eq!(controls.key_for(ControlAction::Restore), None);
        assert_eq!(controls.key_for(ControlAction::ClearLocal), Some('c'));
    }

    #[test]
    fn rejects_bad_bindings_and_empty_grid() {
        let mut config = Config::default();
        config.controls.export = Some('q');
        assert_eq!(config.validate(), Err(ConfigError::ReservedKey('q')));
        config.controls.export = Some('r');
        assert_eq!(config.validate(), Err(ConfigError::DuplicateKey('r')));

        let mut config = Config::default();
        config.intervals.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoIntervals));
        config.days.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoDays));
    }
}
