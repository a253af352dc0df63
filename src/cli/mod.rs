//! CLI command handlers
//!
//! Argument parsing, command implementations and routing.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands, FormArgs};
pub use commands::CommandContext;
pub use router::execute_command;

/// Log filter for a `-v` count. With no flag the configured level wins.
pub fn get_log_level(verbose: u8, configured: Option<&str>) -> String {
    match verbose {
        0 => configured.unwrap_or("info").to_string(),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,hyper=debug,tower=debug".to_string(),
    }
}
