use clap::Parser;
use std::path::PathBuf;

/// Background job watcher for the VM portal.
#[derive(Parser, Debug, Clone)]
#[command(name = "portal-watcher", version, about)]
pub struct Args {
    /// Number of concurrent workers (defaults to `workers.count`, normally 10)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Log at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Lock this file and write the daemon PID into it
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Stay attached to the terminal
    #[arg(long)]
    pub foreground: bool,

    /// Run as this user once started
    #[arg(long)]
    pub user: Option<String>,

    /// Run as this group once started
    #[arg(long)]
    pub group: Option<String>,

    /// Base configuration file, without extension
    #[arg(short, long)]
    pub config: Option<String>,
}

impl Args {
    pub fn worker_count(&self, configured: usize) -> usize {
        self.workers.unwrap_or(configured).max(1)
    }
}
