//! CLI command definitions for the `athena` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod output;
pub mod search;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Ask questions about your course material.
#[derive(Parser)]
#[command(name = "athena", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory holding config.toml, the corpus, and the index.
    #[arg(long, global = true, env = "ATHENA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the embedding index from the corpus directory.
    Ingest {
        /// Corpus directory (defaults to `corpus.dir` from config).
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Re-embed the corpus even if a persisted index exists.
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask a single question.
    Ask {
        /// The question.
        question: String,

        /// Conversation room; omit for a stateless question.
        #[arg(long)]
        room: Option<String>,

        /// Number of passages to retrieve.
        #[arg(short, long)]
        k: Option<usize>,

        /// Generation length limit.
        #[arg(long)]
        max_new_tokens: Option<u32>,

        /// Sampling temperature.
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Show the passages a question retrieves, without generating an answer.
    Search {
        /// The query.
        query: String,

        /// Number of passages to return.
        #[arg(short, long)]
        k: Option<usize>,

        /// Drop passages scoring below this (0.0 keeps everything).
        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Interactive conversation bound to one room.
    Chat {
        /// Room id (a fresh one is generated when omitted).
        #[arg(long)]
        room: Option<String>,
    },

    /// Index, embedder, and model status.
    Status {
        /// Load the model to report its device.
        #[arg(long)]
        load: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_room_and_k() {
        let cli = Cli::parse_from(["athena", "ask", "What is FAISS?", "--room", "r1", "-k", "5", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Ask { question, room, k, .. } => {
                assert_eq!(question, "What is FAISS?");
                assert_eq!(room.as_deref(), Some("r1"));
                assert_eq!(k, Some(5));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn verbosity_is_counted() {
        let cli = Cli::parse_from(["athena", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }
}
