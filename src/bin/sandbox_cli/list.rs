use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use fork_sandbox_core::TestCase;

use super::CliState;

#[derive(Parser, Debug)]
#[command(about = "List test cases in a directory")]
pub struct ListCmd {
    /// Directory to scan (defaults to the last directory used)
    pub dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListedCase {
    name: String,
    path: String,
    /// Step count, or `error` when the file is not a readable test case.
    steps: String,
}

fn scan_directory(dir: &Path) -> Result<Vec<ListedCase>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let steps = match TestCase::load(&path) {
                Ok(case) => case.steps.len().to_string(),
                Err(err) => {
                    tracing::debug!(path = %path.display(), "not a test case: {:#}", err);
                    "error".to_string()
                }
            };
            ListedCase {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.display().to_string(),
                steps,
            }
        })
        .collect())
}

impl ListCmd {
    pub fn execute(&self, state: &mut CliState) -> Result<()> {
        let dir = self
            .dir
            .clone()
            .or_else(|| state.last_directory())
            .ok_or_else(|| anyhow!("No directory given and no previous directory remembered"))?;
        let cases = scan_directory(&dir)?;
        state.remember_directory(&dir);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&cases)?);
            return Ok(());
        }

        if cases.is_empty() {
            println!("No test cases in {}", dir.display());
            return Ok(());
        }
        println!("Test cases in {}:", dir.display());
        for case in &cases {
            println!("  {:<40} {} steps", case.name, case.steps);
        }
        Ok(())
    }
}
