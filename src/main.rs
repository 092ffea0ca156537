//! # Tasky - personal task manager CLI
//!
//! Tasks carry a priority, an optional category and deadline, notes and a
//! checklist of subtasks. They are kept in a local store under `~/.tasky`.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tasky add "Buy milk" --priority high --category shopping --due tomorrow
//!
//! # List open tasks by priority
//! tasky list --status active --sort priority
//!
//! # Check it off
//! tasky toggle "buy milk"
//!
//! # See the month
//! tasky calendar month
//! ```
//!
//! ## Key Commands
//!
//! - `tasky list` - Filter by text, category and status; sort by date, priority, deadline or name
//! - `tasky stats` - Progress, overdue and due-this-week counters
//! - `tasky calendar month|week|day` - Tasks by deadline
//! - `tasky export` / `tasky import` - JSON, CSV and plain-text files
//! - `tasky backup` / `tasky restore` - Full snapshots including the theme
//!
//! Set `RUST_LOG=tasky=debug` to trace what the store is doing.

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tasky::app::Session;
use tasky::cli::Cli;
use tasky::cmd::{self, Commands};
use tasky::config::Config;
use tasky::dates::ReferenceDay;
use tasky::error::{exit_codes, Result};
use tasky::storage::FileStore;

fn main() {
    // Tracing is opt-in via RUST_LOG.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        cmd::cmd_completions(shell);
        return Ok(());
    }

    let data_dir = cli.resolve_data_dir();
    let config = Config::load_from_dir(&data_dir);
    let backend = FileStore::open(&data_dir, config.quota_bytes)?;
    let mut session = Session::open(backend, config);

    let day = ReferenceDay::local_now();
    cmd::run(&mut session, cli.command, &day, Utc::now())
}
