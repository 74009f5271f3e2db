//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Video stream condense.
///
/// Turns raw video player logs into one summary line per playback session.
#[derive(Debug, Parser)]
#[command(name = "vsc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Condense player logs into per-session summaries.
    ///
    /// Each output line is `<json key>\t<json summary>`. Job counters are
    /// written to stderr.
    Condense {
        /// Log files to read. `.gz` files are decompressed; `-` or no file reads stdin.
        inputs: Vec<PathBuf>,

        /// MaxMind ISP database for organization lookups.
        #[arg(long, value_name = "PATH")]
        isp_db: Option<PathBuf>,

        /// MaxMind City database for geo lookups.
        #[arg(long, value_name = "PATH")]
        geo_db: Option<PathBuf>,

        /// Write summaries to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Number of worker threads.
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },

    /// Report which player events and custom fields a source sends.
    Support {
        /// The `source_tag` to report on.
        #[arg(short, long)]
        source_tag: String,

        /// Log files to scan. Unreadable files are skipped.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}
