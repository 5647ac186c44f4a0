use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use fork_sandbox_core::test_case::DEFAULT_RPC_URL;
use fork_sandbox_core::TestCase;

use super::CliState;

#[derive(Parser, Debug)]
#[command(about = "Create an empty test case")]
pub struct NewCmd {
    /// Directory to create the test case in
    pub dir: PathBuf,

    /// Test case name (`.json` is appended when missing)
    pub name: String,

    /// Upstream RPC the fork is created from
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Overwrite an existing file
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

impl NewCmd {
    pub fn execute(&self, state: &mut CliState) -> Result<()> {
        let file_name = if self.name.ends_with(".json") {
            self.name.clone()
        } else {
            format!("{}.json", self.name)
        };
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        let path = self.dir.join(file_name);
        if path.exists() && !self.force {
            return Err(anyhow!(
                "Refusing to overwrite existing test case at {} (pass --force)",
                path.display()
            ));
        }
        TestCase::new(&self.rpc_url).save(&path)?;
        state.remember_directory(&self.dir);

        println!("Created {}", path.display());
        Ok(())
    }
}
