//! Geo Explorer TUI Entry Point
//!
//! Usage:
//!   geo-explorer [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>     Configuration file (default: ~/.config/geo-explorer/config.toml)
//!       --log-file <PATH>   Log file (the terminal belongs to the UI)
//!   -l, --log-level <LVL>   Log level when RUST_LOG is unset (default: info)

use std::fs;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use geo_conductor::{load_config, ConductorConfig, GeminiBackend};
use geo_explorer_tui::{App, ConductorClient};

/// Geo Explorer - chat about places and see them on a map
#[derive(Parser, Debug)]
#[command(name = "geo-explorer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "GEO_EXPLORER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, env = "GEO_EXPLORER_LOG", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("geo-explorer")
        .join("geo-explorer.log")
}

/// Initialize file logging with the specified level
fn init_logging(path: &Path, level: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {path:?}"))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("geo_explorer_tui={level},geo_conductor={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_path = args.log_file.unwrap_or_else(default_log_path);
    init_logging(&log_path, &args.log_level)?;

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    tracing::info!(source = %config.source(), model = %config.backend.model, "Configuration loaded");

    let backend = GeminiBackend::from_config(&config.backend)
        .context("Failed to create the Gemini backend")?;
    let client = ConductorClient::new(
        backend,
        ConductorConfig::from_explorer(&config),
        config.location.coords(),
    );

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: geo-explorer requires a terminal (TTY)");
        eprintln!("Run it interactively, or use `ssh -t` when connecting remotely.");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let mut app = App::new(client);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application error");
    }
    if let Some(goodbye) = app.goodbye() {
        println!("{goodbye}");
    }

    result
}
