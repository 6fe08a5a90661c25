use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "timetable", version, about = "Editable weekly class-schedule grid")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Delimited schedule source, overriding the configured one
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive grid
    Tui,
    /// Print the current grid
    Show,
    /// Print the current entries as delimited lines
    List,
    /// Write one cell and save the whole grid
    Set {
        /// Day column, e.g. Mon
        day: String,
        /// Interval row formatted start-end, e.g. 08:00-09:00
        interval: String,
        /// Cell text; "\n" separates subject from group. Empty clears the cell
        #[arg(default_value = "")]
        text: String,
    },
    /// Export the current grid to delimited text
    Export {
        /// Destination directory (defaults to the configured export directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Discard saved edits and go back to the original schedule
    Restore,
    /// Discard saved edits only
    Clear,
}
