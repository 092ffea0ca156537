use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Personal task manager backed by a local store.
/// Data lives in ~/.tasky unless --data-dir or TASKY_DIR says otherwise.
#[derive(Parser)]
#[command(name = "tasky", version, about = "Personal task manager")]
pub struct Cli {
    /// Directory holding tasks, preferences and tasky.toml.
    #[arg(long, global = true, env = "TASKY_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Data directory: the flag or env var, else `~/.tasky`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".tasky")
        })
    }
}
