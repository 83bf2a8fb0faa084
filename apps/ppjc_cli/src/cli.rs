//! Command-line argument parsing and dispatch.
//!
//! The CLI is built on [`clap`] with derive macros. Invoking `ppjc` with
//! just a source path runs the full compile; the `lexer`, `syntax` and
//! `semantic` subcommands stop the pipeline after the corresponding
//! phase.
//!
//! # Examples
//!
//! ```bash
//! # Full compile: writes every output file including a.frisc
//! ppjc program.c
//!
//! # Only tokenize, writing leksicke_jedinke.txt
//! ppjc lexer program.c
//!
//! # Stop after parsing / after semantic analysis
//! ppjc syntax program.c
//! ppjc semantic program.c
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::driver::{self, DriverError, Options, Phase};

/// Command-line interface of the ppjc compiler driver.
#[derive(Parser)]
#[command(name = "ppjc")]
#[command(about = "A PPJ-C to FRISC compiler", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Phase subcommand; absent for a full compile.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Source file for a full compile.
    pub source: Option<PathBuf>,

    /// Directory holding `lexer_definition.txt` and
    /// `parser_definition.txt`.
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Directory the output files are written into.
    #[arg(long, global = true, default_value = "out")]
    pub out_dir: PathBuf,

    /// Parse-table cache file.
    #[arg(long, global = true, default_value = ".ppjc-cache/parse_table.json")]
    pub cache: PathBuf,

    /// Report LR conflict resolutions on standard error when the table is
    /// (re)generated.
    #[arg(long, global = true)]
    pub log_conflicts: bool,
}

/// Phase subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Tokenize only: write the symbol table and token stream.
    Lexer {
        /// The `.c` source file.
        source: PathBuf,
    },

    /// Stop after parsing: write the derivation and abstract syntax
    /// trees.
    Syntax {
        /// The `.c` source file.
        source: PathBuf,
    },

    /// Stop after semantic analysis: write the scope dump.
    Semantic {
        /// The `.c` source file.
        source: PathBuf,
    },
}

/// Parses arguments and runs the requested pipeline prefix.
///
/// Returns the process exit code; configuration and I/O failures surface
/// as [`DriverError`].
pub fn run_cli() -> Result<i32, DriverError> {
    let cli = Cli::parse();
    let (phase, source) = match cli.command {
        Some(Commands::Lexer { source }) => (Phase::Lexer, source),
        Some(Commands::Syntax { source }) => (Phase::Syntax, source),
        Some(Commands::Semantic { source }) => (Phase::Semantic, source),
        None => {
            let source = cli.source.unwrap_or_else(|| {
                // clap enforces this; the message mirrors its phrasing.
                eprintln!("error: a source file is required");
                std::process::exit(2);
            });
            (Phase::Compile, source)
        }
    };
    let options = Options {
        source,
        config_dir: cli.config_dir,
        out_dir: cli.out_dir,
        cache_path: cli.cache,
        log_conflicts: cli.log_conflicts,
    };
    driver::run(phase, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_compile_takes_a_bare_source_path() {
        let cli = Cli::parse_from(["ppjc", "program.c"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.source, Some(PathBuf::from("program.c")));
        assert_eq!(cli.out_dir, PathBuf::from("out"));
    }

    #[test]
    fn lexer_subcommand_parses() {
        let cli = Cli::parse_from(["ppjc", "lexer", "program.c"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Lexer { ref source }) if source == &PathBuf::from("program.c")
        ));
    }

    #[test]
    fn global_options_apply_to_subcommands() {
        let cli = Cli::parse_from([
            "ppjc",
            "syntax",
            "program.c",
            "--out-dir",
            "build",
            "--log-conflicts",
        ]);
        assert_eq!(cli.out_dir, PathBuf::from("build"));
        assert!(cli.log_conflicts);
    }
}
