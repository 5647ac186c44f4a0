//! Per-run simulation driver.
//!
//! A run is: clear stale run state, start the fork, install fixtures, execute
//! steps in order until one fails, then stop the fork whatever happened.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::client::ChainClient;
use crate::fixtures::{install_fixtures, CodeFixture, DEFAULT_FIXTURES};
use crate::fork::ForkBackend;
use crate::steps::{
    default_handlers, ExecutionContext, StepCompletion, StepHandler, StepOutcome,
};
use crate::test_case::{StepStatus, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step succeeded.
    Completed,
    /// A step failed and later steps were not attempted.
    Halted,
    /// The fork could not be prepared; no step ran.
    SetupFailed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Halted => "halted",
            Self::SetupFailed => "setup_failed",
        }
    }
}

/// Summary of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub file: String,
    pub started_at: String,
    pub outcome: RunOutcome,
    pub total_steps: usize,
    pub succeeded_steps: usize,
    pub failed_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl SimulationReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

pub struct SimulationOrchestrator<F, C> {
    fork: F,
    client: C,
    handlers: Vec<Box<dyn StepHandler>>,
    fixtures: Vec<CodeFixture>,
}

impl<F: ForkBackend, C: ChainClient> SimulationOrchestrator<F, C> {
    pub fn new(fork: F, client: C) -> Self {
        Self {
            fork,
            client,
            handlers: default_handlers(),
            fixtures: DEFAULT_FIXTURES.to_vec(),
        }
    }

    /// Replace the fixtures installed during setup; an empty list skips installation.
    pub fn with_fixtures(mut self, fixtures: Vec<CodeFixture>) -> Self {
        self.fixtures = fixtures;
        self
    }

    pub fn fork(&self) -> &F {
        &self.fork
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Load `path`, simulate it, and rewrite it as steps complete.
    pub async fn simulate_file<CB>(&mut self, path: &Path, on_step: CB) -> Result<SimulationReport>
    where
        CB: FnMut(&StepCompletion) + Send,
    {
        let mut test_case = TestCase::load(path)?;
        Ok(self.simulate(&mut test_case, path, on_step).await)
    }

    /// Run `test_case`, persisting it to `path` after every step.
    ///
    /// Never fails: setup problems end up in the report, step problems in the steps.
    pub async fn simulate<CB>(
        &mut self,
        test_case: &mut TestCase,
        path: &Path,
        on_step: CB,
    ) -> SimulationReport
    where
        CB: FnMut(&StepCompletion) + Send,
    {
        let started = Instant::now();
        let started_at = Utc::now().to_rfc3339();
        let file = path.display().to_string();

        test_case.clear_run_state();
        info!(%file, steps = test_case.steps.len(), "starting simulation");

        let (outcome, halted_at, setup_error) = match self.setup(&test_case.config.rpc_url).await {
            Ok(endpoint) => {
                let halted_at = self.execute(endpoint, test_case, path, on_step).await;
                let outcome = if halted_at.is_some() {
                    RunOutcome::Halted
                } else {
                    RunOutcome::Completed
                };
                (outcome, halted_at, None)
            }
            Err(err) => {
                error!(%file, "simulation setup failed: {:#}", err);
                (RunOutcome::SetupFailed, None, Some(format!("{:#}", err)))
            }
        };

        self.teardown().await;

        let count = |status: StepStatus| {
            test_case
                .steps
                .iter()
                .filter(|step| step.status == Some(status))
                .count()
        };
        let report = SimulationReport {
            file,
            started_at,
            outcome,
            total_steps: test_case.steps.len(),
            succeeded_steps: count(StepStatus::Success),
            failed_steps: count(StepStatus::Failed),
            halted_at,
            error: setup_error,
            elapsed_ms: started.elapsed().as_millis(),
        };
        info!(
            outcome = report.outcome.as_str(),
            succeeded = report.succeeded_steps,
            failed = report.failed_steps,
            elapsed_ms = report.elapsed_ms as u64,
            "simulation finished"
        );
        report
    }

    async fn setup(&mut self, upstream_rpc: &str) -> Result<String> {
        let endpoint = self.fork.start(upstream_rpc).await?;
        if !self.fixtures.is_empty() {
            install_fixtures(&self.client, &endpoint, &self.fixtures).await?;
            info!(count = self.fixtures.len(), "fixtures installed");
        }
        Ok(endpoint)
    }

    /// Run steps in order; returns the index of the step that halted the run.
    async fn execute<CB>(
        &self,
        rpc_url: String,
        test_case: &mut TestCase,
        path: &Path,
        mut on_step: CB,
    ) -> Option<usize>
    where
        CB: FnMut(&StepCompletion) + Send,
    {
        let mut ctx = ExecutionContext {
            rpc_url,
            file_path: path,
            test_case,
            client: &self.client,
            on_step_complete: Some(&mut on_step),
        };

        for index in 0..ctx.test_case.steps.len() {
            let step = &ctx.test_case.steps[index];
            info!(index, step = %step.name, kind = step.type_tag(), "running step");

            match self.handlers.iter().find(|handler| handler.can_handle(step)) {
                Some(handler) => handler.process(index, &mut ctx).await,
                None => {
                    let tag = step.type_tag().to_string();
                    let message = step
                        .malformed_reason()
                        .unwrap_or_else(|| format!("No handler found for step type: {}", tag));
                    warn!(index, kind = %tag, reason = %message, "no handler for step");
                    let outcome = StepOutcome {
                        result: Some(message),
                        ..StepOutcome::bare(StepStatus::Failed)
                    };
                    ctx.complete(index, outcome);
                }
            }

            if ctx.test_case.steps[index].is_failed() {
                warn!(index, "step failed, halting simulation");
                return Some(index);
            }
        }
        None
    }

    async fn teardown(&mut self) {
        if !self.fork.stop().await {
            info!("fork teardown had nothing to stop");
        }
    }
}
