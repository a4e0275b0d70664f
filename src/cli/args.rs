//! CLI argument definitions using clap
//!
//! Commands:
//! - shopdoc import --shop <id> --input <file> [--module <name>] [--existing <file>]
//! - shopdoc next-doc-no --shop <id> [--module <name>] [--date <YYYY-MM-DD>] [--existing <file>]
//!
//! Both accept `--config <path>`; without it the built-in defaults apply.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::ModuleKind;

/// shopdoc - document numbering and bulk import for shop transactions
#[derive(Parser, Debug)]
#[command(name = "shopdoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile a JSON array of documents against the store and print the outcome
    Import {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Transactional module, by name or DocNo code
        #[arg(long, default_value = "purchase")]
        module: ModuleKind,

        /// Shop the documents belong to
        #[arg(long)]
        shop: String,

        /// User recorded in the audit stamps
        #[arg(long, default_value = "import")]
        user: String,

        /// JSON array of documents to import
        #[arg(long)]
        input: PathBuf,

        /// JSON array of stored documents to seed the store with
        #[arg(long)]
        existing: Option<PathBuf>,
    },

    /// Print the DocNo the next created document would receive
    NextDocNo {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Transactional module, by name or DocNo code
        #[arg(long, default_value = "purchase")]
        module: ModuleKind,

        /// Shop to allocate for
        #[arg(long)]
        shop: String,

        /// Document date, defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// JSON array of stored documents to seed the store with
        #[arg(long)]
        existing: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
