//! CLI module for shopdoc
//!
//! Provides command-line interface for:
//! - import: bulk-import a document file into a module
//! - next-doc-no: preview the next DocNo for a module and date

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{import, next_doc_no, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_documents, write_error, write_response};
