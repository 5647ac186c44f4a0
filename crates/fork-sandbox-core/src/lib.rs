//! Fork Sandbox Core
//!
//! Scenario simulation engine for EVM chains.
//!
//! A test case is an ordered list of steps (transfers, contract calls, balance
//! overrides, time warps, deployments, balance checks) executed against an
//! ephemeral local fork of a live chain. Each step's outcome is written back
//! into the test-case file as soon as it finishes; the run halts at the first
//! failing step.
//!
//! # Core Modules
//!
//! - [`fork`]: ForkSession, the owned fork-node subprocess
//! - [`executor`]: single external command execution
//! - [`client`]: ChainClient and its cast-backed adapter
//! - [`receipt`]: transaction receipt text parsing
//! - [`steps`]: one handler per step kind
//! - [`orchestrator`]: setup, sequential dispatch, teardown
//!
//! # Example
//!
//! ```ignore
//! use fork_sandbox_core::{CastClient, ForkSession, ProcessExecutor, SandboxConfig};
//! use fork_sandbox_core::orchestrator::SimulationOrchestrator;
//!
//! let config = SandboxConfig::from_env();
//! let client = CastClient::new(config.cast_bin.clone(), ProcessExecutor::new());
//! let mut orchestrator = SimulationOrchestrator::new(ForkSession::new(config), client);
//! let report = orchestrator.simulate_file(path, |done| println!("{}", done.index)).await?;
//! ```

pub mod client;
pub mod config;
pub mod executor;
pub mod fixtures;
pub mod fork;
pub mod health;
pub mod orchestrator;
pub mod receipt;
pub mod steps;
pub mod test_case;
pub mod units;

pub use client::{CastClient, ChainClient, TxRequest, TxTarget};
pub use config::SandboxConfig;
pub use executor::{CommandExecutor, ProcessExecutor};
pub use fork::{ForkBackend, ForkError, ForkSession, ForkState};
pub use orchestrator::{RunOutcome, SimulationOrchestrator, SimulationReport};
pub use steps::{StepCompletion, StepHandler};
pub use test_case::{Step, StepKind, StepStatus, TestCase};
