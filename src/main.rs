use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::{io, time::Duration};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod cli;
mod ui;

use app::App;
use cli::{Cli, Commands};
use pairsync::config::ConfigManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_file(path),
        None => ConfigManager::new()?,
    };

    match cli.command {
        Some(command) => {
            init_stderr_logging()?;
            let config = config_manager.load_config()?;
            let code = match command {
                Commands::Sync(args) => cli::run_sync(&config, args).await?,
                Commands::Ls(args) => cli::run_ls(&config, args).await?,
                Commands::Probe { host } => cli::run_probe(&config, &host).await?,
            };
            std::process::exit(code);
        }
        None => {
            init_file_logging()?;
            let config = config_manager.load_config()?;
            debug!("Config loaded from {}", config_manager.config_path().display());
            run_tui(App::new(&config)?).await
        }
    }
}

fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive("pairsync=debug".parse()?))
}

/// The terminal belongs to the TUI, so logs go to `logs/pairsync_<timestamp>.log`.
fn init_file_logging() -> Result<()> {
    let log_dir = "logs";
    if !std::path::Path::new(log_dir).exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let log_file = format!(
        "{}/pairsync_{}.log",
        log_dir,
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let file = File::create(&log_file).with_context(|| format!("Failed to create {}", log_file))?;

    fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(env_filter()?)
        .with_ansi(false)
        .with_writer(file)
        .init();
    Ok(())
}

fn init_stderr_logging() -> Result<()> {
    let filter = match std::env::var_os("RUST_LOG") {
        Some(_) => env_filter()?,
        None => EnvFilter::new("pairsync=warn"),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
    Ok(())
}

async fn run_tui(app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("Application error: {:#}", err);
    }
    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> Result<()> {
    loop {
        app.process_events();
        terminal.draw(|f| ui::draw::<B>(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
