//! Chain access used by the step handlers.
//!
//! [`ChainClient`] is the narrow surface the engine needs. [`CastClient`] is the
//! adapter that shells out to a cast-compatible binary for everything except
//! direct JSON-RPC, which goes over HTTP.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::executor::CommandExecutor;

/// A state-changing operation issued as an impersonated sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: String,
    pub target: TxTarget,
    /// Native value, in any form the chain client accepts (`1 ether`, `1000`).
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxTarget {
    Call {
        to: String,
        signature: Option<String>,
        args: Vec<String>,
    },
    Create {
        bytecode: String,
    },
}

impl TxRequest {
    pub fn transfer(from: &str, to: &str, value: &str) -> Self {
        Self {
            from: from.to_string(),
            target: TxTarget::Call {
                to: to.to_string(),
                signature: None,
                args: Vec::new(),
            },
            value: Some(value.to_string()),
        }
    }

    pub fn call(from: &str, to: &str, signature: &str, args: Vec<String>) -> Self {
        Self {
            from: from.to_string(),
            target: TxTarget::Call {
                to: to.to_string(),
                signature: Some(signature.to_string()),
                args,
            },
            value: None,
        }
    }

    pub fn create(from: &str, bytecode: &str) -> Self {
        Self {
            from: from.to_string(),
            target: TxTarget::Create {
                bytecode: bytecode.to_string(),
            },
            value: None,
        }
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a transaction and return the receipt text.
    async fn send(&self, rpc_url: &str, tx: &TxRequest) -> Result<String>;

    /// Replay `tx` as a non-mutating call with tracing. Tolerant: failures of the
    /// call itself still return whatever trace was printed.
    async fn call_with_trace(&self, rpc_url: &str, tx: &TxRequest) -> Result<String>;

    /// Plain read-only contract call.
    async fn call(&self, rpc_url: &str, to: &str, signature: &str, args: &[String])
        -> Result<String>;

    /// Execution trace of a mined transaction.
    async fn trace_transaction(&self, rpc_url: &str, hash: &str, tolerant: bool) -> Result<String>;

    /// Native balance in base units, as printed by the client.
    async fn balance(&self, rpc_url: &str, address: &str) -> Result<String>;

    /// Raw procedure call through the client (`anvil_mine`, `anvil_increaseTime`, ...).
    async fn rpc(&self, rpc_url: &str, method: &str, params: &[String]) -> Result<String>;

    /// Direct JSON-RPC POST; returns the raw response body.
    async fn json_rpc(&self, rpc_url: &str, method: &str, params: Value) -> Result<String>;

    async fn mine(&self, rpc_url: &str, blocks: u64) -> Result<String> {
        self.rpc(rpc_url, "anvil_mine", &[blocks.to_string()]).await
    }

    async fn increase_time(&self, rpc_url: &str, seconds: u64) -> Result<String> {
        self.rpc(rpc_url, "anvil_increaseTime", &[seconds.to_string()])
            .await
    }

    async fn set_code(&self, rpc_url: &str, address: &str, bytecode: &str) -> Result<String> {
        self.rpc(
            rpc_url,
            "anvil_setCode",
            &[address.to_string(), bytecode.to_string()],
        )
        .await
    }
}

/// `cast send ... --unlocked`
pub fn build_send_command(cast_bin: &str, rpc_url: &str, tx: &TxRequest) -> Vec<String> {
    let mut argv = vec![cast_bin.to_string(), "send".to_string()];
    push_tx_args(&mut argv, tx);
    argv.push("--unlocked".to_string());
    push_rpc_url(&mut argv, rpc_url);
    argv
}

/// `cast call ... --trace`
pub fn build_trace_call_command(cast_bin: &str, rpc_url: &str, tx: &TxRequest) -> Vec<String> {
    let mut argv = vec![cast_bin.to_string(), "call".to_string()];
    push_tx_args(&mut argv, tx);
    push_rpc_url(&mut argv, rpc_url);
    argv.push("--trace".to_string());
    argv
}

pub fn build_call_command(
    cast_bin: &str,
    rpc_url: &str,
    to: &str,
    signature: &str,
    args: &[String],
) -> Vec<String> {
    let mut argv = vec![
        cast_bin.to_string(),
        "call".to_string(),
        to.to_string(),
        signature.to_string(),
    ];
    argv.extend(args.iter().cloned());
    push_rpc_url(&mut argv, rpc_url);
    argv
}

pub fn build_run_command(cast_bin: &str, rpc_url: &str, hash: &str) -> Vec<String> {
    let mut argv = vec![cast_bin.to_string(), "run".to_string(), hash.to_string()];
    push_rpc_url(&mut argv, rpc_url);
    argv
}

pub fn build_balance_command(cast_bin: &str, rpc_url: &str, address: &str) -> Vec<String> {
    let mut argv = vec![cast_bin.to_string(), "balance".to_string(), address.to_string()];
    push_rpc_url(&mut argv, rpc_url);
    argv
}

pub fn build_rpc_command(
    cast_bin: &str,
    rpc_url: &str,
    method: &str,
    params: &[String],
) -> Vec<String> {
    let mut argv = vec![cast_bin.to_string(), "rpc".to_string(), method.to_string()];
    argv.extend(params.iter().cloned());
    push_rpc_url(&mut argv, rpc_url);
    argv
}

fn push_tx_args(argv: &mut Vec<String>, tx: &TxRequest) {
    match &tx.target {
        TxTarget::Call {
            to,
            signature,
            args,
        } => {
            argv.push(to.clone());
            if let Some(signature) = signature {
                argv.push(signature.clone());
                argv.extend(args.iter().cloned());
            }
        }
        TxTarget::Create { bytecode } => {
            argv.push("--create".to_string());
            argv.push(bytecode.clone());
        }
    }
    if let Some(value) = &tx.value {
        argv.push("--value".to_string());
        argv.push(value.clone());
    }
    argv.push("--from".to_string());
    argv.push(tx.from.clone());
}

fn push_rpc_url(argv: &mut Vec<String>, rpc_url: &str) {
    argv.push("--rpc-url".to_string());
    argv.push(rpc_url.to_string());
}

/// Client backed by a cast-compatible binary.
pub struct CastClient<E> {
    cast_bin: String,
    executor: E,
    agent: ureq::Agent,
}

impl<E: CommandExecutor> CastClient<E> {
    pub fn new(cast_bin: impl Into<String>, executor: E) -> Self {
        Self {
            cast_bin: cast_bin.into(),
            executor,
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(10))
                .build(),
        }
    }
}

#[async_trait]
impl<E: CommandExecutor> ChainClient for CastClient<E> {
    async fn send(&self, rpc_url: &str, tx: &TxRequest) -> Result<String> {
        let argv = build_send_command(&self.cast_bin, rpc_url, tx);
        self.executor.execute(&argv, false).await
    }

    async fn call_with_trace(&self, rpc_url: &str, tx: &TxRequest) -> Result<String> {
        let argv = build_trace_call_command(&self.cast_bin, rpc_url, tx);
        self.executor.execute(&argv, true).await
    }

    async fn call(
        &self,
        rpc_url: &str,
        to: &str,
        signature: &str,
        args: &[String],
    ) -> Result<String> {
        let argv = build_call_command(&self.cast_bin, rpc_url, to, signature, args);
        self.executor.execute(&argv, false).await
    }

    async fn trace_transaction(&self, rpc_url: &str, hash: &str, tolerant: bool) -> Result<String> {
        let argv = build_run_command(&self.cast_bin, rpc_url, hash);
        self.executor.execute(&argv, tolerant).await
    }

    async fn balance(&self, rpc_url: &str, address: &str) -> Result<String> {
        let argv = build_balance_command(&self.cast_bin, rpc_url, address);
        self.executor.execute(&argv, false).await
    }

    async fn rpc(&self, rpc_url: &str, method: &str, params: &[String]) -> Result<String> {
        let argv = build_rpc_command(&self.cast_bin, rpc_url, method, params);
        self.executor.execute(&argv, false).await
    }

    async fn json_rpc(&self, rpc_url: &str, method: &str, params: Value) -> Result<String> {
        post_json_rpc(&self.agent, rpc_url, method, params).await
    }
}

/// POST a JSON-RPC request and return the body, including error-status bodies.
pub async fn post_json_rpc(
    agent: &ureq::Agent,
    rpc_url: &str,
    method: &str,
    params: Value,
) -> Result<String> {
    let payload = json!({
        "method": method,
        "params": params,
        "id": 1,
        "jsonrpc": "2.0",
    });
    debug!(%rpc_url, %method, "json-rpc request");

    let agent = agent.clone();
    let url = rpc_url.to_string();
    tokio::task::spawn_blocking(move || {
        let response = match agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(anyhow!("JSON-RPC request to {} failed: {}", url, err)),
        };
        response
            .into_string()
            .with_context(|| format!("Failed to read JSON-RPC response from {}", url))
    })
    .await
    .context("JSON-RPC task panicked")?
}
