use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fork_sandbox_core::TestCase;

#[derive(Parser, Debug)]
#[command(about = "Edit or show the steps of a test case")]
pub struct StepsCmd {
    /// Test case JSON file
    pub file: PathBuf,

    #[command(subcommand)]
    pub action: StepsAction,
}

/// Step indices are 1-based on the command line.
#[derive(Subcommand, Debug)]
pub enum StepsAction {
    /// Print the steps with their last run status
    Show {
        /// Output as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Insert an empty placeholder step
    AddEmpty {
        /// Position of the new step (defaults to the end)
        #[arg(long)]
        at: Option<usize>,
    },

    /// Delete a step
    Delete { index: usize },

    /// Insert a copy of a step right after it
    Duplicate { index: usize },

    /// Move a step to another position
    Move { from: usize, to: usize },
}

fn zero_based(index: usize, len: usize) -> Result<usize> {
    if index == 0 || index > len {
        return Err(anyhow!(
            "step {} does not exist (test case has {} steps)",
            index,
            len
        ));
    }
    Ok(index - 1)
}

impl StepsCmd {
    pub fn execute(&self) -> Result<()> {
        let mut test_case = TestCase::load(&self.file)?;
        let len = test_case.steps.len();

        let message = match &self.action {
            StepsAction::Show { json } => {
                print_steps(&test_case, *json)?;
                return Ok(());
            }
            StepsAction::AddEmpty { at } => {
                let index = at.map(|at| at.saturating_sub(1)).unwrap_or(len);
                test_case.add_empty_step(index);
                format!("Added empty step at position {}", index.min(len) + 1)
            }
            StepsAction::Delete { index } => {
                let removed = test_case
                    .delete_step(zero_based(*index, len)?)
                    .ok_or_else(|| anyhow!("step {} does not exist", index))?;
                format!("Deleted step {} ({})", index, removed.name)
            }
            StepsAction::Duplicate { index } => {
                test_case.duplicate_step(zero_based(*index, len)?);
                format!("Duplicated step {}", index)
            }
            StepsAction::Move { from, to } => {
                test_case.move_step(zero_based(*from, len)?, zero_based(*to, len)?);
                format!("Moved step {} to position {}", from, to)
            }
        };

        test_case.save(&self.file)?;
        println!("{}", message);
        Ok(())
    }
}

fn print_steps(test_case: &TestCase, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&test_case.steps)?);
        return Ok(());
    }
    println!("RPC source: {}", test_case.config.rpc_url);
    for (index, step) in test_case.steps.iter().enumerate() {
        let status = step.status.map(|s| s.as_str()).unwrap_or("-");
        println!(
            "{:>3}. [{:<7}] {} ({})",
            index + 1,
            status,
            step.name,
            step.type_tag()
        );
    }
    Ok(())
}
