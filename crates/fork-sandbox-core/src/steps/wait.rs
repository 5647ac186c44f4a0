use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::{ExecutionContext, StepHandler, StepOutcome};
use crate::client::ChainClient;
use crate::test_case::{Step, StepKind};
use crate::units::format_duration;

/// Advance the fork's clock and mine a block so the new timestamp is observable.
pub struct WaitHandler;

#[async_trait]
impl StepHandler for WaitHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::Wait(_)))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        let Some(StepKind::Wait(step)) = ctx.step_kind(index) else {
            return;
        };
        let Some(seconds) = step.seconds.whole_seconds() else {
            warn!(index, seconds = %step.seconds, "invalid wait duration");
            let trace = format!(
                "Failed to warp time: `{}` is not a non-negative whole number of seconds",
                step.seconds
            );
            ctx.complete(index, StepOutcome::failed(trace));
            return;
        };

        let human = format_duration(seconds);
        let outcome = match warp(ctx.client, &ctx.rpc_url, seconds).await {
            Ok(()) => StepOutcome::success(format!(
                "Successfully warped time by {} seconds ({})",
                seconds, human
            )),
            Err(err) => {
                warn!(index, seconds, "time warp failed: {:#}", err);
                StepOutcome::failed(format!("Failed to warp time by {}: {:#}", human, err))
            }
        };
        ctx.complete(index, outcome);
    }
}

async fn warp(client: &dyn ChainClient, rpc_url: &str, seconds: u64) -> Result<()> {
    client.increase_time(rpc_url, seconds).await?;
    client.mine(rpc_url, 1).await?;
    Ok(())
}
