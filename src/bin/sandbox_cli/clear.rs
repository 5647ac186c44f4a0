use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use fork_sandbox_core::TestCase;

#[derive(Parser, Debug)]
#[command(about = "Remove status, trace and result from every step")]
pub struct ClearCmd {
    /// Test case JSON file
    pub file: PathBuf,
}

impl ClearCmd {
    pub fn execute(&self) -> Result<()> {
        let mut test_case = TestCase::load(&self.file)?;
        test_case.clear_run_state();
        test_case.save(&self.file)?;
        println!(
            "Cleared run results of {} steps in {}",
            test_case.steps.len(),
            self.file.display()
        );
        Ok(())
    }
}
