//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// PII Sentinel: offline entry point over the detection orchestration
/// engine.
///
/// The real request/response transport is an external
/// collaborator; this CLI drives the same `Orchestrator::detect` entry
/// point locally, over a file, an inline argument, or stdin.
#[derive(Parser, Debug)]
#[command(name = "pii-sentinel")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the `SQLite` configuration store.
    ///
    /// Defaults to `.pii-sentinel/config.db` in the current directory.
    /// When the file does not exist, an in-memory snapshot derived from
    /// the boot-time catalogue is used instead.
    #[arg(long, env = "PII_SENTINEL_CONFIG_DB")]
    pub config_db: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect PII entities in text and print the final result.
    Detect {
        /// Path to a file containing the input text.
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Inline input text.
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read input text from stdin.
        #[arg(long)]
        stdin: bool,

        /// Global detection threshold (defaults to 0.5).
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Detect PII entities, streaming one update per chunk (NDJSON).
    StreamDetect {
        /// Path to a file containing the input text.
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Inline input text.
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read input text from stdin.
        #[arg(long)]
        stdin: bool,

        /// Global detection threshold (defaults to 0.5).
        #[arg(short, long)]
        threshold: Option<f32>,
    },
}

impl Cli {
    /// Returns the configuration store path, using the default if not
    /// specified.
    #[must_use]
    pub fn get_config_db_path(&self) -> PathBuf {
        self.config_db.clone().unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_db_path() {
        let cli = Cli {
            config_db: None,
            verbose: false,
            format: "text".to_string(),
            command: Commands::Detect {
                file: None,
                text: None,
                stdin: false,
                threshold: None,
            },
        };
        assert_eq!(cli.get_config_db_path(), PathBuf::from(crate::storage::DEFAULT_DB_PATH));
    }
}
