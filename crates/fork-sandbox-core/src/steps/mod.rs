//! Step handlers.
//!
//! One handler per step kind. The orchestrator picks the first handler whose
//! [`StepHandler::can_handle`] matches; the handler issues its chain calls,
//! records the outcome on the step at its index, rewrites the document and
//! notifies the completion callback. Handlers never return errors: every
//! failure ends up in the step's `status`/`trace`/`result`.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

use crate::client::ChainClient;
use crate::test_case::{Step, StepKind, StepStatus, TestCase};

mod balance;
mod empty;
mod send;
mod set_balance;
mod wait;

pub use balance::{CheckBalanceHandler, CheckTokenBalanceHandler};
pub use empty::EmptyHandler;
pub use send::{ApproveHandler, DeployContractHandler, TransactionHandler, TransferHandler};
pub use set_balance::SetBalanceHandler;
pub use wait::WaitHandler;

/// Emitted once per finished step.
#[derive(Debug, Clone, Serialize)]
pub struct StepCompletion {
    pub index: usize,
    pub status: StepStatus,
    pub step: Step,
}

pub type StepCallback<'a> = dyn FnMut(&StepCompletion) + Send + 'a;

/// What a handler concluded about one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub trace: Option<String>,
    pub result: Option<String>,
}

impl StepOutcome {
    pub fn bare(status: StepStatus) -> Self {
        Self {
            status,
            trace: None,
            result: None,
        }
    }

    pub fn success(trace: impl Into<String>) -> Self {
        Self {
            trace: Some(trace.into()),
            ..Self::bare(StepStatus::Success)
        }
    }

    pub fn failed(trace: impl Into<String>) -> Self {
        Self {
            trace: Some(trace.into()),
            ..Self::bare(StepStatus::Failed)
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}

/// Per-run state handed to every handler invocation.
pub struct ExecutionContext<'a> {
    /// Endpoint of the running fork.
    pub rpc_url: String,
    /// Backing file rewritten after each step.
    pub file_path: &'a Path,
    pub test_case: &'a mut TestCase,
    pub client: &'a dyn ChainClient,
    pub on_step_complete: Option<&'a mut StepCallback<'a>>,
}

impl ExecutionContext<'_> {
    /// Snapshot of the step kind at `index`.
    pub fn step_kind(&self, index: usize) -> Option<StepKind> {
        self.test_case.steps.get(index).and_then(Step::kind).cloned()
    }

    /// Record `outcome` on the step at `index`, persist the document and notify.
    ///
    /// A failed write is logged and does not change the recorded status.
    pub fn complete(&mut self, index: usize, outcome: StepOutcome) {
        let Some(step) = self.test_case.steps.get_mut(index) else {
            warn!(index, "completion for a step that does not exist");
            return;
        };
        step.record(outcome.status, outcome.trace, outcome.result);
        let snapshot = step.clone();
        info!(index, step = %snapshot.name, status = %outcome.status, "step finished");

        if let Err(err) = self.test_case.save(self.file_path) {
            error!(
                index,
                file = %self.file_path.display(),
                "failed to persist test case: {:#}",
                err
            );
        }

        if let Some(callback) = self.on_step_complete.as_mut() {
            callback(&StepCompletion {
                index,
                status: outcome.status,
                step: snapshot,
            });
        }
    }
}

#[async_trait]
pub trait StepHandler: Send + Sync {
    fn can_handle(&self, step: &Step) -> bool;

    async fn process(&self, index: usize, ctx: &mut ExecutionContext<'_>);
}

/// Handlers for every known step kind, in dispatch order.
pub fn default_handlers() -> Vec<Box<dyn StepHandler>> {
    vec![
        Box::new(EmptyHandler),
        Box::new(TransactionHandler),
        Box::new(TransferHandler),
        Box::new(ApproveHandler),
        Box::new(SetBalanceHandler),
        Box::new(DeployContractHandler),
        Box::new(CheckBalanceHandler),
        Box::new(CheckTokenBalanceHandler),
        Box::new(WaitHandler),
    ]
}
