mod app;
mod cli;
mod clipboard;
mod config;
mod editor;
mod event;
mod logging;
mod store;
mod sync;
mod ui;

use std::io;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use app::App;
use cli::Cli;
use config::Config;
use store::DataManager;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.config {
        println!("{}", Config::config_path().display());
        return Ok(());
    }

    let mut config = Config::load_or_create();
    logging::init(&Config::log_path(), cli.verbose);

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }
    let data_path = config.data_path();

    if cli.dir {
        println!("{}", data_path.display());
        return Ok(());
    }

    let mut store = DataManager::open(&data_path)
        .with_context(|| format!("cannot open data directory {}", data_path.display()))?;
    for warning in store.load_warnings() {
        tracing::warn!("{warning}");
    }
    tracing::info!(root = %store.root().display(), notes = store.note_count(), "data directory opened");

    if cli.is_batch() {
        return run_batch(&cli, &mut store);
    }

    // Setup terminal
    enable_raw_mode().context("cannot enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)
        .context("cannot enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("cannot create terminal")?;

    let mut app = App::new(config, store);
    let result = event::run_app(&mut terminal, &mut app);

    // Pending edits are written before the terminal is handed back.
    app.flush_all();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    finish(result)
}

/// Result of the whole run once the terminal has been handed back.
fn finish(result: io::Result<()>) -> anyhow::Result<()> {
    if let Err(err) = result {
        tracing::error!("event loop failed: {err}");
        return Err(err).context("event loop failed");
    }
    tracing::info!("stickies exiting");
    Ok(())
}

/// Export or import without starting the terminal UI.
fn run_batch(cli: &Cli, store: &mut DataManager) -> anyhow::Result<()> {
    if let Some(path) = &cli.export {
        let count = store
            .export_notes(path)
            .with_context(|| format!("export to {} failed", path.display()))?;
        println!("Exported {count} notes to {}", path.display());
    } else if let Some(path) = &cli.import {
        let count = store
            .import_notes(path)
            .with_context(|| format!("import from {} failed", path.display()))?;
        println!("Imported {count} notes from {}", path.display());
    }
    Ok(())
}
