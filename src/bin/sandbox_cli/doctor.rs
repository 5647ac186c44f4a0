use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use fork_sandbox_core::health::{run_doctor, DoctorConfig, DoctorReport};
use fork_sandbox_core::{SandboxConfig, TestCase};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validate fork tooling and the upstream RPC endpoint"
)]
pub struct DoctorCmd {
    /// Upstream RPC to probe with `eth_chainId`
    #[arg(long, conflicts_with = "file")]
    rpc_url: Option<String>,

    /// Probe the upstream RPC configured in this test case
    #[arg(long)]
    file: Option<PathBuf>,

    /// Timeout for the RPC probe, in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn print_report(report: &DoctorReport) {
    println!("fork-sandbox doctor");
    println!("  fork launcher: {}", report.anvil_bin);
    println!("  chain client:  {}", report.cast_bin);
    if let Some(rpc_url) = &report.rpc_url {
        println!("  upstream RPC:  {}", rpc_url);
    }
    println!();

    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", status, check.name, check.detail);
        if let Some(remediation) = &check.remediation {
            println!("      fix: {}", remediation);
        }
    }

    println!();
    println!(
        "Summary: {} passed, {} failed",
        report.passed, report.failed
    );
}

impl DoctorCmd {
    pub async fn execute(&self, config: &SandboxConfig, state_file: &Path) -> Result<()> {
        let rpc_url = match (&self.rpc_url, &self.file) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(file)) => Some(TestCase::load(file)?.config.rpc_url),
            (None, None) => None,
        };

        let report = run_doctor(&DoctorConfig {
            sandbox: config.clone(),
            rpc_url,
            state_file: state_file.to_path_buf(),
            timeout_secs: self.timeout_secs,
        })
        .await?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("serialize doctor report")?
            );
        } else {
            print_report(&report);
        }

        if report.ok {
            Ok(())
        } else {
            Err(anyhow!("doctor found {} failing checks", report.failed))
        }
    }
}
