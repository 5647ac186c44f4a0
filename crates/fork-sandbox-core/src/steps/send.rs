use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ExecutionContext, StepHandler, StepOutcome};
use crate::client::{ChainClient, TxRequest};
use crate::receipt::parse_receipt;
use crate::test_case::{Step, StepKind};

/// How to obtain a trace when a mined transaction did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevertTrace {
    /// Re-run the request as a traced call.
    ReplayCall,
    /// Trace the mined transaction by hash when one is known.
    ByHash,
}

/// Submit `tx` and translate the receipt into a step outcome.
async fn send_and_trace(
    client: &dyn ChainClient,
    rpc_url: &str,
    index: usize,
    tx: &TxRequest,
    revert_trace: RevertTrace,
) -> StepOutcome {
    let output = match client.send(rpc_url, tx).await {
        Ok(output) => output,
        Err(err) => {
            let message = err.to_string();
            warn!(index, error = %message, "send failed, capturing call trace");
            let trace = match client.call_with_trace(rpc_url, tx).await {
                Ok(trace) => trace,
                Err(_) => message.clone(),
            };
            return StepOutcome::failed(trace).with_result(message);
        }
    };

    let receipt = parse_receipt(&output);
    debug!(index, hash = ?receipt.hash, status = ?receipt.status, "receipt parsed");

    if receipt.is_success() {
        let Some(hash) = receipt.hash.as_deref() else {
            let trace = "trace unavailable: receipt has no transaction hash".to_string();
            return StepOutcome::success(trace).with_result(output);
        };
        return match client.trace_transaction(rpc_url, hash, false).await {
            Ok(trace) => StepOutcome::success(trace),
            Err(err) => {
                warn!(index, %hash, "could not fetch trace of mined transaction: {}", err);
                StepOutcome::success(format!("trace unavailable: {}", err)).with_result(output)
            }
        };
    }

    let fallback = match (revert_trace, receipt.hash.as_deref()) {
        (RevertTrace::ByHash, Some(hash)) => client.trace_transaction(rpc_url, hash, true).await,
        _ => client.call_with_trace(rpc_url, tx).await,
    };
    let trace = fallback.unwrap_or_else(|err| err.to_string());
    StepOutcome::failed(trace).with_result(output)
}

/// Arbitrary contract call with a signature and argument list.
pub struct TransactionHandler;

#[async_trait]
impl StepHandler for TransactionHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::Transaction(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::Transaction(step)) = ctx.step_kind(index) else {
            return;
        };
        let args = step
            .arguments
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let tx = TxRequest::call(&step.from, &step.to, &step.signature, args);
        let outcome =
            send_and_trace(ctx.client, &ctx.rpc_url, index, &tx, RevertTrace::ByHash).await;
        ctx.complete(index, outcome);
    }
}

/// Native value transfer.
pub struct TransferHandler;

#[async_trait]
impl StepHandler for TransferHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::Transfer(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::Transfer(step)) = ctx.step_kind(index) else {
            return;
        };
        let tx = TxRequest::transfer(&step.from, &step.to, &step.value);
        let outcome =
            send_and_trace(ctx.client, &ctx.rpc_url, index, &tx, RevertTrace::ReplayCall).await;
        ctx.complete(index, outcome);
    }
}

/// ERC-20 `approve(spender, amount)`.
pub struct ApproveHandler;

#[async_trait]
impl StepHandler for ApproveHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::Approve(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::Approve(step)) = ctx.step_kind(index) else {
            return;
        };
        let tx = TxRequest::call(
            &step.from,
            &step.to,
            "approve(address,uint256)",
            vec![step.spender.clone(), step.amount.clone()],
        );
        let outcome =
            send_and_trace(ctx.client, &ctx.rpc_url, index, &tx, RevertTrace::ReplayCall).await;
        ctx.complete(index, outcome);
    }
}

/// Contract creation from raw bytecode.
pub struct DeployContractHandler;

#[async_trait]
impl StepHandler for DeployContractHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::DeployContract(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::DeployContract(step)) = ctx.step_kind(index) else {
            return;
        };
        let tx = TxRequest::create(&step.from, &step.deployment_bytecode);
        let outcome =
            send_and_trace(ctx.client, &ctx.rpc_url, index, &tx, RevertTrace::ReplayCall).await;
        ctx.complete(index, outcome);
    }
}
