use crate::config::Config;
use crate::controller::{FileSource, ScheduleController, SourceText, StartupOrigin};
use crate::grid::{split_cell_text, ScheduleGrid};
use crate::model::{encode_to_delimited_text, CellKey, Interval};
use crate::storage::{FileStore, StateStore};
use crate::ui;
use anyhow::{bail, Result};
use std::path::PathBuf;

type Controller = ScheduleController<ScheduleGrid, FileStore>;

pub fn tui(config: &Config) -> Result<()> {
    let (controller, source, origin) = open(config)?;
    ui::run(controller, source, origin, config)
}

pub fn show(config: &Config) -> Result<()> {
    let (controller, source, origin) = open(config)?;
    print_origin(&source, origin);
    if let Some(at) = controller.store().load().and_then(|s| s.saved_at) {
        println!("Edits saved {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    let grid = controller.grid();
    let layout = grid.layout();
    let width = layout
        .days
        .iter()
        .enumerate()
        .map(|(col, day)| {
            (0..layout.intervals.len())
                .map(|row| cell_summary(grid.cell_at(row, col)).chars().count())
                .chain(std::iter::once(day.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();
    let label_width = layout
        .intervals
        .iter()
        .map(|i| i.key().chars().count())
        .max()
        .unwrap_or(0);

    let mut header = format!("{:label_width$}", "");
    for (day, w) in layout.days.iter().zip(&width) {
        header.push_str(&format!(" | {:w$}", day, w = *w));
    }
    println!("{}", header.trim_end());
    println!("{}", "-".repeat(header.chars().count()));
    for (row, interval) in layout.intervals.iter().enumerate() {
        let mut line = format!("{:label_width$}", interval.key());
        for (col, w) in width.iter().enumerate() {
            line.push_str(&format!(
                " | {:w$}",
                cell_summary(grid.cell_at(row, col)),
                w = *w
            ));
        }
        println!("{}", line.trim_end());
    }
    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let (controller, source, origin) = open(config)?;
    if origin.is_none() {
        bail!("could not load {}", source.describe());
    }
    let text = encode_to_delimited_text(&controller.state());
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(())
}

pub fn set(config: &Config, day: String, interval: String, text: String) -> Result<()> {
    let (mut controller, source, origin) = open(config)?;
    if origin.is_none() {
        bail!("could not load {}", source.describe());
    }
    let key = CellKey::new(day, Interval::from_key(interval));
    if controller.grid().layout().position_of(&key).is_none() {
        bail!("no cell for {} in the configured grid", key);
    }
    let count = controller.commit_cell(&key, &text.replace("\\n", "\n"))?;
    println!(
        "Saved {} ({} entries) to {}",
        key,
        count,
        controller.store().path().display()
    );
    Ok(())
}

pub fn export(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let (controller, source, origin) = open(config)?;
    if origin.is_none() {
        bail!("could not load {}", source.describe());
    }
    let dir = output.unwrap_or_else(|| config.export_dir());
    let path = controller.export_to(&dir)?;
    println!("Exported {} entries to {}", controller.state().len(), path.display());
    Ok(())
}

pub fn restore(config: &Config) -> Result<()> {
    let (mut controller, source, origin) = open(config)?;
    let placed = controller.restore_original()?;
    match origin {
        Some(_) => println!("Restored original schedule ({} entries)", placed),
        None => println!(
            "Cleared saved edits; original {} is unavailable",
            source.describe()
        ),
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    let mut store = FileStore::in_data_dir()?;
    store.clear()?;
    println!("Cleared saved edits at {}", store.path().display());
    Ok(())
}

fn open(config: &Config) -> Result<(Controller, FileSource, Option<StartupOrigin>)> {
    let grid = ScheduleGrid::new(config.layout());
    let store = FileStore::in_data_dir()?;
    let source = FileSource::new(&config.source);
    let mut controller = ScheduleController::new(grid, store);
    let origin = controller.startup(&source);
    Ok((controller, source, origin))
}

fn print_origin(source: &FileSource, origin: Option<StartupOrigin>) {
    match origin {
        Some(o) => println!("{} ({}, {} entries)", source.describe(), o.label(), o.placed()),
        None => println!("{} (not loaded)", source.describe()),
    }
}

fn cell_summary(text: &str) -> String {
    let (subject, group) = split_cell_text(text);
    if group.is_empty() {
        subject
    } else {
        format!("{} ({})", subject, group)
    }
}
