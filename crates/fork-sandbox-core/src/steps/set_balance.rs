use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use super::{ExecutionContext, StepHandler, StepOutcome};
use crate::client::ChainClient;
use crate::test_case::{SetBalanceStep, Step, StepKind};
use crate::units::{to_base_units, to_hex_quantity};

/// Overwrite an account's native balance on the fork, then mine a block.
pub struct SetBalanceHandler;

#[async_trait]
impl StepHandler for SetBalanceHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::SetBalance(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::SetBalance(step)) = ctx.step_kind(index) else {
            return;
        };
        let outcome = match set_balance(ctx.client, &ctx.rpc_url, &step).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(index, address = %step.address, "set_balance failed: {:#}", err);
                StepOutcome::failed(format!("{:#}", err))
            }
        };
        ctx.complete(index, outcome);
    }
}

async fn set_balance(
    client: &dyn ChainClient,
    rpc_url: &str,
    step: &SetBalanceStep,
) -> Result<StepOutcome> {
    let wei = to_base_units(&step.value)?;
    let quantity = to_hex_quantity(&wei)?;
    let body = client
        .json_rpc(rpc_url, "anvil_setBalance", json!([step.address, quantity]))
        .await?;
    client.mine(rpc_url, 1).await?;

    if let Some(message) = rpc_error_message(&body) {
        return Ok(StepOutcome::failed(format!("Error: {}", message)));
    }
    Ok(StepOutcome::success(format!(
        "Successfully set balance for {} to {}",
        step.address, step.value
    )))
}

/// Message of a JSON-RPC error response, if the body is one.
fn rpc_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error").filter(|error| !error.is_null())?;
    Some(match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => error.to_string(),
    })
}
