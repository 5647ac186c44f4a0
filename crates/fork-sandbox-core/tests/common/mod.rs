#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! - [`FakeFork`]: in-memory fork backend counting starts and stops
//! - [`FakeChain`]: scripted chain client recording every call
//! - [`write_case`]: write a test-case document into a temp dir

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

use fork_sandbox_core::client::{ChainClient, TxRequest, TxTarget};
use fork_sandbox_core::fork::ForkBackend;

pub const FORK_URL: &str = "http://127.0.0.1:9996";

pub const SUCCESS_RECEIPT: &str = "blockNumber             7\n\
status                  1 (success)\n\
transactionHash         0xfeed\n";

pub const REVERTED_RECEIPT: &str = "blockNumber             7\n\
status                  0 (failed)\n\
transactionHash         0xdead\n";

#[derive(Debug, Default)]
pub struct FakeFork {
    pub fail_with: Option<String>,
    pub running: bool,
    pub starts: usize,
    pub stops: usize,
    pub upstream: Option<String>,
}

impl FakeFork {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ForkBackend for FakeFork {
    async fn start(&mut self, upstream_rpc: &str) -> Result<String> {
        self.starts += 1;
        self.upstream = Some(upstream_rpc.to_string());
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{}", message));
        }
        self.running = true;
        Ok(FORK_URL.to_string())
    }

    async fn stop(&mut self) -> bool {
        self.stops += 1;
        std::mem::replace(&mut self.running, false)
    }
}

/// Chain client returning scripted outputs.
///
/// Sends consume `sends` in order and default to a successful receipt.
#[derive(Default)]
pub struct FakeChain {
    pub calls: Mutex<Vec<String>>,
    pub sends: Mutex<VecDeque<Result<String, String>>>,
    pub call_trace: Option<String>,
    pub run_output: Option<Result<String, String>>,
    pub balance_output: Option<Result<String, String>>,
    /// Keyed by signature.
    pub call_outputs: HashMap<String, Result<String, String>>,
    /// Keyed by method; methods not listed succeed with an empty string.
    pub rpc_failures: HashMap<String, String>,
    pub json_rpc_body: Option<String>,
}

impl FakeChain {
    pub fn with_sends(sends: Vec<Result<&str, &str>>) -> Self {
        let sends = sends
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Self {
            sends: Mutex::new(sends),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

fn describe(tx: &TxRequest) -> String {
    let target = match &tx.target {
        TxTarget::Call {
            to,
            signature,
            args,
        } => match signature {
            Some(signature) => format!("{} {} {}", to, signature, args.join(" ")),
            None => to.clone(),
        },
        TxTarget::Create { bytecode } => format!("--create {}", bytecode),
    };
    match &tx.value {
        Some(value) => format!("{} {} value={}", tx.from, target.trim_end(), value),
        None => format!("{} {}", tx.from, target.trim_end()),
    }
}

fn scripted(output: &Option<Result<String, String>>, default: &str) -> Result<String> {
    match output {
        Some(Ok(out)) => Ok(out.clone()),
        Some(Err(err)) => Err(anyhow!("{}", err)),
        None => Ok(default.to_string()),
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn send(&self, rpc_url: &str, tx: &TxRequest) -> Result<String> {
        assert_eq!(rpc_url, FORK_URL);
        self.record(format!("send {}", describe(tx)));
        let next = self.sends.lock().expect("sends lock").pop_front();
        scripted(&next, SUCCESS_RECEIPT)
    }

    async fn call_with_trace(&self, _rpc_url: &str, tx: &TxRequest) -> Result<String> {
        self.record(format!("call_with_trace {}", describe(tx)));
        Ok(self.call_trace.clone().unwrap_or_default())
    }

    async fn call(
        &self,
        _rpc_url: &str,
        to: &str,
        signature: &str,
        args: &[String],
    ) -> Result<String> {
        self.record(format!("call {} {} {}", to, signature, args.join(" ")).trim_end().to_string());
        scripted(&self.call_outputs.get(signature).cloned(), "0x0")
    }

    async fn trace_transaction(&self, _rpc_url: &str, hash: &str, tolerant: bool) -> Result<String> {
        self.record(format!("run {} tolerant={}", hash, tolerant));
        scripted(&self.run_output, "Traces:\n  [21000] 0xB::fallback()\n")
    }

    async fn balance(&self, _rpc_url: &str, address: &str) -> Result<String> {
        self.record(format!("balance {}", address));
        scripted(&self.balance_output, "0")
    }

    async fn rpc(&self, _rpc_url: &str, method: &str, params: &[String]) -> Result<String> {
        let call = format!("rpc {} {}", method, params.join(" "));
        self.record(call.trim_end().to_string());
        match self.rpc_failures.get(method) {
            Some(err) => Err(anyhow!("{}", err)),
            None => Ok(String::new()),
        }
    }

    async fn json_rpc(&self, _rpc_url: &str, method: &str, params: Value) -> Result<String> {
        self.record(format!("json_rpc {} {}", method, params));
        Ok(self
            .json_rpc_body
            .clone()
            .unwrap_or_else(|| r#"{"jsonrpc":"2.0","id":1,"result":null}"#.to_string()))
    }
}

/// Write `document` as `case.json` under a fresh temp dir.
pub fn write_case(document: &Value) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("case.json");
    std::fs::write(&path, serde_json::to_string_pretty(document).expect("json"))
        .expect("write case");
    (dir, path)
}

pub fn read_case(path: &PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read case")).expect("parse case")
}
