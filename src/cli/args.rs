//! Command-line argument parsing
//!
//! Provides clap-based CLI with subcommands for querying, serving,
//! corpus download and diagnostics.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fetch::{DEFAULT_FROM_DATE, DEFAULT_UNTIL_DATE};

/// kokkai-rag - question answering over National Diet proceedings
#[derive(Parser, Debug)]
#[command(name = "kokkai-rag")]
#[command(version = "0.3.0")]
#[command(
    about = "Hybrid RAG with human-in-the-loop review over National Diet proceedings",
    long_about = None
)]
pub struct Args {
    /// Ollama base URL
    #[arg(long, default_value = "http://127.0.0.1:11434")]
    pub ollama_url: String,

    /// Ollama model used for answer synthesis
    #[arg(long, default_value = "llama3.2")]
    pub model: String,

    /// Data directory holding corpus/ and sample/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Verbosity level: default (info), -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question against the local corpus
    Ask {
        /// Query text
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum number of documents to retrieve
        #[arg(long, default_value_t = 5)]
        max_results: usize,

        /// Caller roles, comma-separated
        #[arg(long, value_delimiter = ',', default_value = "public")]
        roles: Vec<String>,
    },

    /// Run the local development HTTP server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Download corpus batches from the kokkai API
    Download {
        /// Total records to fetch
        #[arg(long, default_value_t = 500)]
        total: usize,

        /// Records per request (API limit: 100)
        #[arg(long, default_value_t = 100)]
        batch_size: usize,

        /// Full-text keyword; empty switches to the date range
        #[arg(long, default_value = "")]
        keyword: String,

        /// Range start (YYYY-MM-DD), used when no keyword is given
        #[arg(long, default_value = DEFAULT_FROM_DATE)]
        from_date: String,

        /// Range end (YYYY-MM-DD), used when no keyword is given
        #[arg(long, default_value = DEFAULT_UNTIL_DATE)]
        until_date: String,

        /// Corpus output directory (default: <data-dir>/corpus)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Re-fetch batches that already exist on disk
        #[arg(long)]
        no_skip_existing: bool,
    },

    /// Diagnose corpus and Ollama connectivity
    Doctor,
}
