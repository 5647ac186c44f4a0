//! fork-sandbox: run blockchain scenarios against a local fork
//!
//! ## Features
//!
//! - **run**: simulate a test case step by step, halting at the first failure
//! - **list**: show the test cases in a directory
//! - **new**: create an empty test case
//! - **clear**: strip results of a previous run
//! - **steps**: add, delete, duplicate, move or show steps
//! - **doctor**: check the fork launcher, chain client and upstream RPC
//!
//! ## Example Usage
//!
//! ```bash
//! # Create a test case forking a local node
//! fork-sandbox new ./cases transfer --rpc-url http://localhost:8545
//!
//! # Run it and print progress as steps finish
//! fork-sandbox run ./cases/transfer.json
//!
//! # Machine-readable report
//! fork-sandbox run ./cases/transfer.json --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fork_sandbox_core::SandboxConfig;

mod sandbox_cli;

use sandbox_cli::{
    clear::ClearCmd, doctor::DoctorCmd, list::ListCmd, new::NewCmd, run::RunCmd,
    steps::StepsCmd, CliState,
};

#[derive(Parser)]
#[command(
    name = "fork-sandbox",
    author,
    version,
    about = "Simulate multi-step blockchain scenarios on a local fork",
    long_about = "Runs ordered steps (transfers, contract calls, balance overrides, time warps,\n\
                  deployments, balance checks) against an ephemeral fork of a live chain and\n\
                  records each step's status and trace back into the test-case file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Local port for the fork node
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Fork launcher binary (anvil-compatible)
    #[arg(long, global = true)]
    anvil_bin: Option<String>,

    /// Chain client binary (cast-compatible)
    #[arg(long, global = true)]
    cast_bin: Option<String>,

    /// State file remembering the last used directory
    #[arg(long, global = true)]
    state_file: Option<std::path::PathBuf>,

    /// Verbose output (debug logs and full traces)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a test case against a fresh fork
    Run(RunCmd),

    /// List test cases in a directory
    List(ListCmd),

    /// Create an empty test case
    New(NewCmd),

    /// Remove status, trace and result from every step
    Clear(ClearCmd),

    /// Edit or show the steps of a test case
    Steps(StepsCmd),

    /// Check tooling and upstream connectivity
    Doctor(DoctorCmd),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Run(_) => "run",
            Commands::List(_) => "list",
            Commands::New(_) => "new",
            Commands::Clear(_) => "clear",
            Commands::Steps(_) => "steps",
            Commands::Doctor(_) => "doctor",
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "fork_sandbox=debug,fork_sandbox_core=debug"
    } else {
        "fork_sandbox=info,fork_sandbox_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        port,
        anvil_bin,
        cast_bin,
        state_file,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    let mut config = SandboxConfig::from_env();
    if let Some(port) = port {
        config.fork_port = port;
    }
    if let Some(bin) = anvil_bin {
        config.anvil_bin = bin;
    }
    if let Some(bin) = cast_bin {
        config.cast_bin = bin;
    }

    let state_file = state_file.unwrap_or_else(|| sandbox_cli::sandbox_home().join("state.json"));
    let mut state = CliState::load_or_default(&state_file)?;
    tracing::debug!(command = command.name(), "dispatching");

    let result = match command {
        Commands::Run(cmd) => cmd.execute(&config, verbose).await,
        Commands::List(cmd) => cmd.execute(&mut state),
        Commands::New(cmd) => cmd.execute(&mut state),
        Commands::Clear(cmd) => cmd.execute(),
        Commands::Steps(cmd) => cmd.execute(),
        Commands::Doctor(cmd) => cmd.execute(&config, &state_file).await,
    };

    if state.dirty {
        if let Err(err) = state.save(&state_file) {
            tracing::warn!("failed to save CLI state: {:#}", err);
        }
    }

    result
}
