//! Contracts installed on every fresh fork before steps run.

use anyhow::{Context, Result};
use tracing::debug;

use crate::client::ChainClient;

/// Code installed at a fixed address.
#[derive(Debug, Clone, Copy)]
pub struct CodeFixture {
    pub label: &'static str,
    pub address: &'static str,
    pub bytecode: &'static str,
}

/// Stand-in for the Arbitrum `ArbSys` precompile: `arbBlockNumber()` returns
/// `block.number`, so contracts that query it keep working on a plain fork.
pub const ARB_SYS: CodeFixture = CodeFixture {
    label: "ArbSys",
    address: "0x0000000000000000000000000000000000000064",
    bytecode: "0x6080604052348015600e575f5ffd5b50600436106026575f3560e01c8063a3b1b31d14602a575b5f5ffd5b4360405190815260200160405180910390f3fea26469706673582212205b62f2339f15a02a7786f3cfde869d9dfbbc7c5089cab69b981dc169170b3ddf64736f6c634300081c0033",
};

pub const DEFAULT_FIXTURES: &[CodeFixture] = &[ARB_SYS];

/// Install `fixtures` on the fork at `rpc_url` and mine one block.
pub async fn install_fixtures(
    client: &dyn ChainClient,
    rpc_url: &str,
    fixtures: &[CodeFixture],
) -> Result<()> {
    for fixture in fixtures {
        debug!(label = fixture.label, address = fixture.address, "installing fixture code");
        client
            .set_code(rpc_url, fixture.address, fixture.bytecode)
            .await
            .with_context(|| format!("Failed to install {} fixture", fixture.label))?;
    }
    client
        .mine(rpc_url, 1)
        .await
        .context("Failed to mine block after fixture setup")?;
    Ok(())
}
