use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::client::post_json_rpc;
use crate::config::{SandboxConfig, TOOL_ENV};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub id: String,
    pub name: String,
    pub status: DoctorStatus,
    pub passed: bool,
    pub detail: String,
    pub remediation: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub ok: bool,
    pub passed: usize,
    pub failed: usize,
    pub anvil_bin: String,
    pub cast_bin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    pub checks: Vec<DoctorCheck>,
}

#[derive(Debug, Clone)]
pub struct DoctorConfig {
    pub sandbox: SandboxConfig,
    /// Upstream RPC to probe; skipped when `None`.
    pub rpc_url: Option<String>,
    pub state_file: PathBuf,
    pub timeout_secs: u64,
}

fn pass_check(id: &str, name: &str, detail: String, start: Instant) -> DoctorCheck {
    DoctorCheck {
        id: id.to_string(),
        name: name.to_string(),
        status: DoctorStatus::Pass,
        passed: true,
        detail,
        remediation: None,
        duration_ms: start.elapsed().as_millis(),
    }
}

fn fail_check(
    id: &str,
    name: &str,
    detail: String,
    remediation: &str,
    start: Instant,
) -> DoctorCheck {
    DoctorCheck {
        id: id.to_string(),
        name: name.to_string(),
        status: DoctorStatus::Fail,
        passed: false,
        detail,
        remediation: Some(remediation.to_string()),
        duration_ms: start.elapsed().as_millis(),
    }
}

fn run_version_command(binary: &str) -> Result<String> {
    let output = Command::new(binary)
        .arg("--version")
        .envs(TOOL_ENV.iter().copied())
        .output()
        .with_context(|| format!("failed to execute `{binary} --version`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(anyhow!(
            "`{binary} --version` exited with status {}: {}",
            output.status,
            stderr
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

fn check_state_file_permissions(state_file: &Path) -> Result<String> {
    let parent = state_file
        .parent()
        .ok_or_else(|| anyhow!("state file has no parent directory"))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create state-file directory {}", parent.display()))?;

    let existed = state_file.exists();
    let _file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_file)
        .with_context(|| format!("open state file {}", state_file.display()))?;

    if !existed {
        let _ = std::fs::remove_file(state_file);
    }

    Ok(format!("state file is writable: {}", state_file.display()))
}

/// Ask the upstream node for its chain id.
async fn probe_chain_id(rpc_url: &str, timeout: Duration) -> Result<String> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let body = post_json_rpc(&agent, rpc_url, "eth_chainId", json!([])).await?;
    let response: Value = serde_json::from_str(&body)
        .with_context(|| format!("non-JSON response from {}", rpc_url))?;
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(anyhow!("eth_chainId returned an error: {}", error));
    }
    let chain_id = response
        .get("result")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("eth_chainId response has no result"))?;
    let decimal = u64::from_str_radix(chain_id.trim_start_matches("0x"), 16)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| chain_id.to_string());
    Ok(format!("chain id {} at {}", decimal, rpc_url))
}

pub async fn run_doctor(config: &DoctorConfig) -> Result<DoctorReport> {
    let mut checks = Vec::new();

    let anvil_start = Instant::now();
    checks.push(match run_version_command(&config.sandbox.anvil_bin) {
        Ok(detail) => pass_check("fork_launcher", "Fork Launcher", detail, anvil_start),
        Err(err) => fail_check(
            "fork_launcher",
            "Fork Launcher",
            err.to_string(),
            "Install Foundry (https://getfoundry.sh) or point `--anvil-bin` at an anvil binary.",
            anvil_start,
        ),
    });

    let cast_start = Instant::now();
    checks.push(match run_version_command(&config.sandbox.cast_bin) {
        Ok(detail) => pass_check("chain_client", "Chain Client", detail, cast_start),
        Err(err) => fail_check(
            "chain_client",
            "Chain Client",
            err.to_string(),
            "Install Foundry (https://getfoundry.sh) or point `--cast-bin` at a cast binary.",
            cast_start,
        ),
    });

    let state_start = Instant::now();
    checks.push(match check_state_file_permissions(&config.state_file) {
        Ok(detail) => pass_check(
            "state_file_permissions",
            "State File Permissions",
            detail,
            state_start,
        ),
        Err(err) => fail_check(
            "state_file_permissions",
            "State File Permissions",
            err.to_string(),
            "Set FORK_SANDBOX_HOME to a writable directory.",
            state_start,
        ),
    });

    if let Some(rpc_url) = &config.rpc_url {
        let rpc_start = Instant::now();
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        checks.push(match probe_chain_id(rpc_url, timeout).await {
            Ok(detail) => pass_check("upstream_rpc", "Upstream RPC", detail, rpc_start),
            Err(err) => fail_check(
                "upstream_rpc",
                "Upstream RPC",
                format!("{:#}", err),
                "Check the test case `rpcUrl` and that the node accepts JSON-RPC over HTTP.",
                rpc_start,
            ),
        });
    }

    let passed = checks.iter().filter(|c| c.passed).count();
    let failed = checks.len() - passed;
    Ok(DoctorReport {
        ok: failed == 0,
        passed,
        failed,
        anvil_bin: config.sandbox.anvil_bin.clone(),
        cast_bin: config.sandbox.cast_bin.clone(),
        rpc_url: config.rpc_url.clone(),
        checks,
    })
}
