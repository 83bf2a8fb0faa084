//! ppjc - standalone binary
//!
//! Thin wrapper around [`ppjc_cli::run_cli`]: command logic lives in the
//! library crate for testability; this binary only maps outcomes to exit
//! codes.
//!
//! # Exit Codes
//!
//! - `0` - success
//! - `1` - any compiler-detected error, or an I/O / configuration failure

fn main() {
    match ppjc_cli::run_cli() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
