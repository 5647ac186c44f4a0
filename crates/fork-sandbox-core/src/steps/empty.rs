use async_trait::async_trait;

use super::{ExecutionContext, StepHandler, StepOutcome};
use crate::test_case::{Step, StepKind, StepStatus};

/// Placeholder step: succeeds without touching the chain.
pub struct EmptyHandler;

#[async_trait]
impl StepHandler for EmptyHandler {
    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.kind(), Some(StepKind::Empty))
    }

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>) {
        ctx.complete(index, StepOutcome::bare(StepStatus::Success));
    }
}
