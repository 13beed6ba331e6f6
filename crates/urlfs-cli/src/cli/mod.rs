//! CLI for the urlfs file-system and plug-in layer.

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use urlfs_core::config;

use commands::{run_blocklist, run_info, run_scan, run_url, BlocklistAction};

/// Top-level CLI for the urlfs toolkit.
#[derive(Debug, Parser)]
#[command(name = "urlfs")]
#[command(about = "urlfs: URL-addressed file systems and plug-in discovery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Parse a URL or native path and show its components.
    Url {
        /// Full URL (`file:///…`) or native path (`/…`, `C:\…`).
        input: String,

        /// Collapse `.` and `..` segments before printing.
        #[arg(long)]
        normalize: bool,
    },

    /// Show file and volume information for a native path.
    Info {
        /// Native path to inspect.
        path: String,
    },

    /// Scan folders for plug-in modules and report cache hits.
    Scan {
        /// Extra folders to scan, in addition to the configured ones.
        #[arg(long = "folder", value_name = "PATH")]
        folders: Vec<String>,
    },

    /// Inspect or edit the plug-in block-list.
    Blocklist {
        #[command(subcommand)]
        action: BlocklistAction,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Url { input, normalize } => run_url(&input, normalize)?,
            CliCommand::Info { path } => run_info(&path)?,
            CliCommand::Scan { folders } => run_scan(&cfg, &folders)?,
            CliCommand::Blocklist { action } => run_blocklist(&cfg, action)?,
            CliCommand::Completions { shell } => {
                let mut command = Cli::command();
                let name = command.get_name().to_string();
                clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            }
        }

        Ok(())
    }
}
