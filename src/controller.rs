use crate::grid::{read_state, render, GridView};
use crate::model::{encode_to_delimited_text, parse_delimited_text, CellKey, ScheduleEntry};
use crate::storage::StateStore;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Fixed name of the exported file.
pub const EXPORT_FILE_NAME: &str = "timetable_export.csv";

/// Supplies the original, unedited schedule text.
pub trait SourceText {
    fn fetch(&self) -> Result<String>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl SourceText for FileSource {
    fn fetch(&self) -> Result<String> {
        fs::read_to_string(&self.path).with_context(|| format!("reading {:?}", self.path))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Where the rendered grid came from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOrigin {
    Saved { placed: usize },
    Original { placed: usize },
}

impl StartupOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            StartupOrigin::Saved { .. } => "saved edits",
            StartupOrigin::Original { .. } => "original",
        }
    }

    pub fn placed(&self) -> usize {
        match self {
            StartupOrigin::Saved { placed } | StartupOrigin::Original { placed } => *placed,
        }
    }
}

/// Keeps the grid, the persisted state and the original text in sync.
pub struct ScheduleController<G: GridView, S: StateStore> {
    grid: G,
    store: S,
    original: Option<String>,
}

impl<G: GridView, S: StateStore> ScheduleController<G, S> {
    pub fn new(grid: G, store: S) -> Self {
        ScheduleController {
            grid,
            store,
            original: None,
        }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    /// Fetches the original text and renders either the saved edits or the original.
    /// A failed fetch is logged and leaves the grid untouched.
    pub fn startup(&mut self, source: &dyn SourceText) -> Option<StartupOrigin> {
        let text = match source.fetch() {
            Ok(text) => text,
            Err(err) => {
                error!(source = %source.describe(), error = %format!("{:#}", err), "could not load schedule source");
                return None;
            }
        };
        self.original = Some(text);

        let origin = match self.store.load() {
            Some(saved) if !saved.entries.is_empty() => StartupOrigin::Saved {
                placed: render(&mut self.grid, &saved.entries),
            },
            _ => StartupOrigin::Original {
                placed: self.render_original(),
            },
        };
        info!(origin = origin.label(), placed = origin.placed(), "schedule loaded");
        Some(origin)
    }

    /// Current grid contents as entries.
    pub fn state(&self) -> Vec<ScheduleEntry> {
        read_state(&self.grid)
    }

    /// Writes `text` into one cell, then rebuilds and saves the whole grid's state.
    pub fn commit_cell(&mut self, key: &CellKey, text: &str) -> Result<usize> {
        self.grid.set_cell(key, text);
        self.commit()
    }

    pub fn commit(&mut self) -> Result<usize> {
        let state = read_state(&self.grid);
        self.store.save(&state)?;
        Ok(state.len())
    }

    pub fn export_text(&self) -> String {
        encode_to_delimited_text(&self.state())
    }

    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
        let path = dir.join(EXPORT_FILE_NAME);
        fs::write(&path, self.export_text()).with_context(|| format!("writing {:?}", path))?;
        info!(path = %path.display(), "exported schedule");
        Ok(path)
    }

    /// Drops saved edits and re-renders from the text fetched at startup.
    pub fn restore_original(&mut self) -> Result<usize> {
        self.store.clear()?;
        Ok(self.render_original())
    }

    /// Drops saved edits and reloads everything from the source. The grid is
    /// emptied first, so a failed fetch leaves it unrendered.
    pub fn clear_local(&mut self, source: &dyn SourceText) -> Result<Option<StartupOrigin>> {
        self.store.clear()?;
        self.original = None;
        self.grid.clear();
        Ok(self.startup(source))
    }

    fn render_original(&mut self) -> usize {
        let entries = self
            .original
            .as_deref()
            .map(parse_delimited_text)
            .unwrap_or_default();
        render(&mut self.grid, &entries)
    }
}
