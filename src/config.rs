use clap::Parser;
use std::path::PathBuf;

/// Line-oriented JSON sidecar for worksheet grading and learning reports.
#[derive(Debug, Parser)]
#[command(name = "tutord", version, about)]
pub struct Config {
    /// Workspace directory to open on startup.
    #[arg(long, env = "TUTORD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter for stderr output (e.g. "debug", "tutord=trace"). Overrides RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,
}
