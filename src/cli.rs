//! CLI interface for the interview agent

use crate::config::{OracleKind, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nco-interview")]
#[command(about = "Match a resume to NCO job roles and run an adaptive skills interview")]
#[command(long_about = "Extract skills from a resume, find the closest occupations in the National \
Classification of Occupations with semantic search, then let a language model interview the \
candidate one skill at a time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match a resume to a job and interview the candidate
    Interview {
        /// Path to resume file (PDF, TXT, MD, MARKDOWN)
        #[arg(short, long)]
        resume: PathBuf,

        /// Search text; defaults to the configured query, then the resume skills
        #[arg(short, long)]
        query: Option<String>,

        /// Number of job matches to show
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Interview for the Nth match (1-based) instead of prompting
        #[arg(short, long)]
        pick: Option<usize>,

        /// Save the interview summary; without a path a timestamped name is used
        #[arg(short, long, num_args = 0..=1, value_name = "PATH")]
        save: Option<Option<PathBuf>>,

        /// Summary format: text, markdown, json
        #[arg(short, long)]
        format: Option<String>,

        /// Oracle backend: ollama, local
        #[arg(short, long)]
        oracle: Option<String>,

        /// Oracle model (Ollama tag or catalog model name)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search the job index with free text
    Search {
        /// Free-text query
        #[arg(short, long)]
        query: String,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the skills extracted from a resume
    Skills {
        /// Path to resume file (PDF, TXT, MD, MARKDOWN)
        #[arg(short, long)]
        resume: PathBuf,
    },

    /// Embed a job record table and write the index assets
    BuildIndex {
        /// Job records: a JSON array or a CSV export with NCO_Code/Title/Description columns
        #[arg(short, long)]
        records: PathBuf,

        /// Output directory; defaults to the configured assets directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List catalog models
    List {
        /// Show only embedding models
        #[arg(long)]
        embeddings: bool,

        /// Show only oracle models
        #[arg(long)]
        oracles: bool,
    },

    /// Download a model
    Download {
        /// Catalog model name
        model: String,

        /// Force re-download if model exists
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a downloaded model
    Remove {
        /// Model name to remove
        model: String,
    },

    /// Show model information
    Info {
        /// Model name
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "interview.top_k")
        key: String,

        /// Configuration value
        value: String,
    },
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "text" | "txt" | "console" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: text, markdown, json",
            format
        )),
    }
}

pub fn parse_oracle_kind(kind: &str) -> Result<OracleKind, String> {
    kind.parse::<OracleKind>().map_err(|e| e.to_string())
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
