use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use fork_sandbox_core::orchestrator::{RunOutcome, SimulationOrchestrator};
use fork_sandbox_core::steps::StepCompletion;
use fork_sandbox_core::{
    CastClient, ForkSession, ProcessExecutor, SandboxConfig, StepStatus, TestCase,
};

#[derive(Parser, Debug)]
#[command(about = "Simulate a test case against a fresh fork")]
pub struct RunCmd {
    /// Test case JSON file (rewritten as steps complete)
    pub file: PathBuf,

    /// Print the final report and steps as JSON instead of progress lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn print_completion(done: &StepCompletion, verbose: bool) {
    let step = &done.step;
    let mark = match done.status {
        StepStatus::Success => "\x1b[32mok\x1b[0m",
        StepStatus::Failed => "\x1b[31mFAILED\x1b[0m",
    };
    println!(
        "[step:{}] {} ({}) ... {}",
        done.index + 1,
        step.name,
        step.type_tag(),
        mark
    );
    if let Some(result) = &step.result {
        println!("    result: {}", result.trim());
    }
    if verbose || step.is_failed() {
        if let Some(trace) = &step.trace {
            for line in trace.trim().lines() {
                println!("    | {}", line);
            }
        }
    }
}

impl RunCmd {
    pub async fn execute(&self, config: &SandboxConfig, verbose: bool) -> Result<()> {
        let client = CastClient::new(config.cast_bin.clone(), ProcessExecutor::new());
        let mut orchestrator = SimulationOrchestrator::new(ForkSession::new(config.clone()), client);
        if !config.inject_fixtures {
            orchestrator = orchestrator.with_fixtures(Vec::new());
        }

        let json_output = self.json;
        if !json_output {
            println!("Simulating {}", self.file.display());
        }
        let mut test_case = TestCase::load(&self.file)?;
        let report = orchestrator
            .simulate(&mut test_case, &self.file, |done| {
                if !json_output {
                    print_completion(done, verbose);
                }
            })
            .await;

        if json_output {
            let payload = serde_json::json!({
                "report": report,
                "steps": test_case.steps,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("serialize run report")?
            );
        } else {
            match report.outcome {
                RunOutcome::Completed => println!(
                    "Simulation complete: {}/{} succeeded",
                    report.succeeded_steps, report.total_steps
                ),
                RunOutcome::Halted => println!(
                    "Simulation halted at step {}: {}/{} succeeded",
                    report.halted_at.map(|i| i + 1).unwrap_or_default(),
                    report.succeeded_steps,
                    report.total_steps
                ),
                RunOutcome::SetupFailed => println!(
                    "Simulation setup failed: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                ),
            }
        }

        match report.outcome {
            RunOutcome::Completed => Ok(()),
            RunOutcome::Halted => Err(anyhow!(
                "step {} failed",
                report.halted_at.map(|i| i + 1).unwrap_or_default()
            )),
            RunOutcome::SetupFailed => Err(anyhow!(
                "fork setup failed: {}",
                report.error.unwrap_or_default()
            )),
        }
    }
}
