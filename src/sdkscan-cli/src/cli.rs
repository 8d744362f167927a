//! CLI argument definitions for sdkscan

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sdkscan")]
#[command(about = "Find, deduplicate and name SDK modules in game packages", long_about = None)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a directory tree for SDK modules
    #[command(visible_alias = "f")]
    Find {
        /// Directory to search
        input: PathBuf,

        /// Directory the modules are extracted to
        #[arg(long)]
        outdir: PathBuf,

        /// Key file (defaults to the configured one, then ~/.switch/prod.keys)
        #[arg(short, long, env = "SDKSCAN_KEYSET")]
        keyset: Option<PathBuf>,

        /// Title key file (defaults to ~/.switch/title.keys)
        #[arg(long)]
        titlekeys: Option<PathBuf>,

        /// Development key file tried when the primary keys fail
        /// (defaults to ~/.switch/dev.keys)
        #[arg(long)]
        devkeys: Option<PathBuf>,

        /// Decrypt with development keys instead of retail
        #[arg(short, long)]
        dev: bool,
    },

    /// Configure default key files
    #[command(visible_alias = "c")]
    Configure {
        /// Set the default key file
        #[arg(long)]
        keyset: Option<PathBuf>,

        /// Set the default title key file
        #[arg(long)]
        title_keys: Option<PathBuf>,

        /// Set the default development key file
        #[arg(long)]
        dev_keyset: Option<PathBuf>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}
