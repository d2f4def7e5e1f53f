//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mailsift")]
#[command(about = "Triage and analyze stored emails with a text-generation service", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze one batch of unanalyzed emails
    Run {
        /// Emails to pull (defaults to the configured batch size)
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Show aggregate statistics over stored analyses
    Stats,
    /// Print stored analyses for an email as JSON
    Show {
        /// Email identifier
        email_id: String,
    },
    /// Store the inference API key in the system keyring
    SetKey {
        /// API key
        key: String,
    },
    /// Remove the inference API key from the system keyring
    ClearKey,
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsift")
        .join("config.json")
}

/// Default database location.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsift")
        .join("mailsift.db")
}
