mod cli;
mod commands;
mod config;
mod controller;
mod editor;
mod grid;
mod logging;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    logging::init(!matches!(command, cli::Command::Tui));

    let mut config = config::Config::load(args.config.as_deref())?;
    if let Some(source) = args.source {
        config.source = source;
    }

    match command {
        cli::Command::Tui => commands::tui(&config),
        cli::Command::Show => commands::show(&config),
        cli::Command::List => commands::list(&config),
        cli::Command::Set {
            day,
            interval,
            text,
        } => commands::set(&config, day, interval, text),
        cli::Command::Export { output } => commands::export(&config, output),
        cli::Command::Restore => commands::restore(&config),
        cli::Command::Clear => commands::clear(),
    }
}
