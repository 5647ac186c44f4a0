//! CLI subcommand implementations for fork-sandbox

pub mod clear;
pub mod doctor;
pub mod list;
pub mod new;
pub mod run;
pub mod state;
pub mod steps;

pub use state::CliState;

use std::path::PathBuf;

/// `$FORK_SANDBOX_HOME`, or `~/.fork-sandbox`.
pub fn sandbox_home() -> PathBuf {
    std::env::var("FORK_SANDBOX_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".fork-sandbox")
        })
}
