//! Fork Sandbox
//!
//! Runs multi-step blockchain scenarios against an ephemeral local fork of a
//! live chain. The engine lives in [`fork_sandbox_core`]; this crate ships the
//! `fork-sandbox` command-line interface on top of it.

pub use fork_sandbox_core::*;
