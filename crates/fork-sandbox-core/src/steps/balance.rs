use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ExecutionContext, StepHandler, StepOutcome};
use crate::client::ChainClient;
use crate::test_case::{CheckTokenBalanceStep, Step, StepKind};
use crate::units::{format_units, parse_quantity, NATIVE_DECIMALS};

const TOKEN_BALANCE_SIGNATURE: &str = "balanceOf(address)";
const TOKEN_DECIMALS_SIGNATURE: &str = "decimals()";
/// Larger values are treated as a broken `decimals()` and ignored.
const MAX_TOKEN_DECIMALS: u32 = 77;

/// Read-only native balance query.
pub struct CheckBalanceHandler;

#[async_trait]
impl StepHandler for CheckBalanceHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::CheckBalance(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::CheckBalance(step)) = ctx.step_kind(index) else {
            return;
        };
        let trace = format!("Balance check for {}", step.address);
        let outcome = match native_balance(ctx.client, &ctx.rpc_url, &step.address).await {
            Ok(formatted) => StepOutcome::success(trace).with_result(formatted),
            Err(err) => {
                warn!(index, address = %step.address, "balance check failed: {:#}", err);
                StepOutcome::failed(format!("{:#}", err))
            }
        };
        ctx.complete(index, outcome);
    }
}

async fn native_balance(client: &dyn ChainClient, rpc_url: &str, address: &str) -> Result<String> {
    let raw = client.balance(rpc_url, address).await?;
    let wei = parse_quantity(&raw)?;
    Ok(format_units(&wei, NATIVE_DECIMALS as u32, "ETH"))
}

/// Read-only ERC-20 balance query.
pub struct CheckTokenBalanceHandler;

#[async_trait]
impl StepHandler for CheckTokenBalanceHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::CheckTokenBalance(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::CheckTokenBalance(step)) = ctx.step_kind(index) else {
            return;
        };
        let trace = format!(
            "Token balance check for {} on token {}",
            step.address, step.token
        );
        let outcome = match token_balance(ctx.client, &ctx.rpc_url, &step).await {
            Ok(formatted) => StepOutcome::success(trace).with_result(formatted),
            Err(err) => {
                warn!(index, token = %step.token, "token balance check failed: {:#}", err);
                StepOutcome::failed(format!("{:#}", err))
            }
        };
        ctx.complete(index, outcome);
    }
}

async fn token_balance(
    client: &dyn ChainClient,
    rpc_url: &str,
    step: &CheckTokenBalanceStep,
) -> Result<String> {
    let raw = client
        .call(
            rpc_url,
            &step.token,
            TOKEN_BALANCE_SIGNATURE,
            std::slice::from_ref(&step.address),
        )
        .await?;
    let balance = parse_quantity(&raw)?;
    let decimals = token_decimals(client, rpc_url, &step.token).await;
    Ok(format_units(&balance, decimals, "Tokens"))
}

/// `decimals()` of the token, or 18 when the token does not answer sensibly.
async fn token_decimals(client: &dyn ChainClient, rpc_url: &str, token: &str) -> u32 {
    let fallback = NATIVE_DECIMALS as u32;
    let raw = match client
        .call(rpc_url, token, TOKEN_DECIMALS_SIGNATURE, &[])
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            warn!(%token, "decimals() lookup failed, assuming {}: {}", fallback, err);
            return fallback;
        }
    };
    match parse_quantity(&raw).map(|value| u32::try_from(&value)) {
        Ok(Ok(decimals)) if decimals <= MAX_TOKEN_DECIMALS => {
            debug!(%token, decimals, "token decimals resolved");
            decimals
        }
        _ => {
            warn!(%token, output = %raw.trim(), "unusable decimals() output, assuming {}", fallback);
            fallback
        }
    }
}
