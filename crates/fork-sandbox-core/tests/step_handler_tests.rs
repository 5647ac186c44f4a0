//! Per-kind handler behavior, driven through a single-step simulation.

mod common;

use common::{read_case, write_case, FakeChain, FakeFork, REVERTED_RECEIPT};
use fork_sandbox_core::orchestrator::{SimulationOrchestrator, SimulationReport};
use serde_json::{json, Value};

async fn run_single(step: Value, chain: FakeChain) -> (Value, Vec<String>, SimulationReport) {
    let document = json!({ "config": { "rpcUrl": "https://fork-source" }, "steps": [step] });
    let (_dir, path) = write_case(&document);
    let mut orchestrator =
        SimulationOrchestrator::new(FakeFork::default(), chain).with_fixtures(Vec::new());
    let report = orchestrator
        .simulate_file(&path, |_| {})
        .await
        .expect("simulate");
    let saved = read_case(&path);
    (saved["steps"][0].clone(), orchestrator.client().calls(), report)
}

#[tokio::test]
async fn transaction_splits_arguments_on_whitespace() {
    let step = json!({
        "type": "transaction", "name": "swap", "from": "0xA", "to": "0xPool",
        "signature": "swap(uint256,address)", "arguments": "  100   0xB "
    });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(calls[0], "send 0xA 0xPool swap(uint256,address) 100 0xB");
}

#[tokio::test]
async fn reverted_transaction_is_traced_by_hash() {
    let step = json!({
        "type": "transaction", "name": "boom", "from": "0xA", "to": "0xC",
        "signature": "explode()", "arguments": ""
    });
    let chain = FakeChain {
        run_output: Some(Ok("Traces:\n  [2300] 0xC::explode() ← [Revert]".to_string())),
        ..FakeChain::with_sends(vec![Ok(REVERTED_RECEIPT)])
    };
    let (saved, calls, report) = run_single(step, chain).await;

    assert_eq!(saved["status"], "failed");
    assert!(saved["trace"].as_str().unwrap_or_default().contains("[Revert]"));
    assert_eq!(saved["result"], REVERTED_RECEIPT);
    assert_eq!(report.halted_at, Some(0));
    assert!(calls.contains(&"run 0xdead tolerant=true".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("call_with_trace")));
}

#[tokio::test]
async fn receipt_without_status_is_a_failure() {
    let step = json!({ "type": "transfer", "name": "odd", "from": "0xA", "to": "0xB", "value": "5" });
    let chain = FakeChain {
        call_trace: Some("fallback trace".to_string()),
        ..FakeChain::with_sends(vec![Ok("nothing useful here")])
    };
    let (saved, calls, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "failed");
    assert_eq!(saved["trace"], "fallback trace");
    assert_eq!(saved["result"], "nothing useful here");
    assert!(calls.contains(&"call_with_trace 0xA 0xB value=5".to_string()));
}

#[tokio::test]
async fn confirmed_transaction_with_missing_trace_stays_successful() {
    let step = json!({ "type": "transfer", "name": "pay", "from": "0xA", "to": "0xB", "value": "1" });
    let chain = FakeChain {
        run_output: Some(Err("rpc does not support debug_traceTransaction".to_string())),
        ..FakeChain::default()
    };
    let (saved, _, report) = run_single(step, chain).await;

    assert!(report.is_success());
    assert_eq!(saved["status"], "success");
    assert_eq!(
        saved["trace"],
        "trace unavailable: rpc does not support debug_traceTransaction"
    );
    assert!(saved["result"]
        .as_str()
        .unwrap_or_default()
        .contains("0xfeed"));
}

#[tokio::test]
async fn deploy_contract_sends_creation_bytecode() {
    let step = json!({
        "type": "deploy_contract", "name": "deploy", "from": "0xA", "deploymentBytecode": "0x6080"
    });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(saved["deploymentBytecode"], "0x6080");
    assert_eq!(calls[0], "send 0xA --create 0x6080");
}

#[tokio::test]
async fn set_balance_posts_hex_quantity_and_mines() {
    let step = json!({ "type": "set_balance", "name": "fund", "address": "0xB", "value": "1.5 ether" });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(saved["trace"], "Successfully set balance for 0xB to 1.5 ether");
    assert_eq!(
        calls,
        vec![
            r#"json_rpc anvil_setBalance ["0xB","0x14d1120d7b160000"]"#.to_string(),
            "rpc anvil_mine 1".to_string(),
        ]
    );
}

#[tokio::test]
async fn set_balance_error_body_fails_the_step() {
    let step = json!({ "type": "set_balance", "name": "fund", "address": "nope", "value": "1" });
    let chain = FakeChain {
        json_rpc_body: Some(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid address"}}"#
                .to_string(),
        ),
        ..FakeChain::default()
    };
    let (saved, _, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "failed");
    assert_eq!(saved["trace"], "Error: invalid address");
}

#[tokio::test]
async fn set_balance_rejects_unparseable_values_without_calls() {
    let step = json!({ "type": "set_balance", "name": "fund", "address": "0xB", "value": "a lot" });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "failed");
    assert!(saved["trace"].as_str().unwrap_or_default().contains("a lot"));
    assert!(calls.is_empty());
}

#[tokio::test]
async fn check_balance_formats_wei() {
    let step = json!({ "type": "check_balance", "name": "bob", "address": "0xB" });
    let chain = FakeChain {
        balance_output: Some(Ok("1500000000000000000\n".to_string())),
        ..FakeChain::default()
    };
    let (saved, _, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(saved["trace"], "Balance check for 0xB");
    assert_eq!(
        saved["result"],
        "1.500000000000000000 ETH (1500000000000000000 wei)"
    );
}

#[tokio::test]
async fn check_balance_query_failure_fails_the_step() {
    let step = json!({ "type": "check_balance", "name": "bob", "address": "0xB" });
    let chain = FakeChain {
        balance_output: Some(Err("connection refused".to_string())),
        ..FakeChain::default()
    };
    let (saved, _, report) = run_single(step, chain).await;

    assert_eq!(saved["status"], "failed");
    assert_eq!(saved["trace"], "connection refused");
    assert_eq!(report.failed_steps, 1);
}

#[tokio::test]
async fn token_balance_uses_token_decimals() {
    let step = json!({ "type": "check_token_balance", "name": "usdc", "token": "0xT", "address": "0xB" });
    let mut chain = FakeChain::default();
    chain
        .call_outputs
        .insert("balanceOf(address)".to_string(), Ok("2500000 [2.5e6]".to_string()));
    chain
        .call_outputs
        .insert("decimals()".to_string(), Ok("6".to_string()));
    let (saved, calls, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(saved["trace"], "Token balance check for 0xB on token 0xT");
    assert_eq!(saved["result"], "2.500000 Tokens (2500000 wei)");
    assert_eq!(calls[0], "call 0xT balanceOf(address) 0xB");
    assert_eq!(calls[1], "call 0xT decimals()");
}

#[tokio::test]
async fn token_balance_defaults_to_18_decimals() {
    let step = json!({ "type": "check_token_balance", "name": "tkn", "token": "0xT", "address": "0xB" });
    let mut chain = FakeChain::default();
    chain.call_outputs.insert(
        "balanceOf(address)".to_string(),
        Ok("0x0000000000000000000000000000000000000000000000000de0b6b3a7640000".to_string()),
    );
    chain
        .call_outputs
        .insert("decimals()".to_string(), Err("execution reverted".to_string()));
    let (saved, _, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(
        saved["result"],
        "1.000000000000000000 Tokens (1000000000000000000 wei)"
    );
}

#[tokio::test]
async fn wait_warps_time_and_mines() {
    let step = json!({ "type": "wait", "name": "a day", "seconds": "86400" });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "success");
    assert_eq!(saved["trace"], "Successfully warped time by 86400 seconds (1 day)");
    assert_eq!(saved["seconds"], "86400");
    assert_eq!(calls, vec!["rpc anvil_increaseTime 86400", "rpc anvil_mine 1"]);
}

#[tokio::test]
async fn wait_failure_embeds_duration_phrase() {
    let step = json!({ "type": "wait", "name": "90s", "seconds": 90 });
    let mut chain = FakeChain::default();
    chain
        .rpc_failures
        .insert("anvil_increaseTime".to_string(), "method not found".to_string());
    let (saved, calls, _) = run_single(step, chain).await;

    assert_eq!(saved["status"], "failed");
    assert_eq!(
        saved["trace"],
        "Failed to warp time by 1 minute, 30 seconds: method not found"
    );
    assert_eq!(calls.len(), 1);
}

#[tokio::test]
async fn wait_rejects_negative_seconds() {
    let step = json!({ "type": "wait", "name": "back", "seconds": -5 });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved["status"], "failed");
    assert!(saved["trace"].as_str().unwrap_or_default().contains("-5"));
    assert!(calls.is_empty());
}

#[tokio::test]
async fn empty_step_succeeds_without_calls() {
    let step = json!({ "type": "empty", "name": "Empty Step 1" });
    let (saved, calls, _) = run_single(step, FakeChain::default()).await;

    assert_eq!(saved, json!({ "type": "empty", "name": "Empty Step 1", "status": "success" }));
    assert!(calls.is_empty());
}
