//! Runtime configuration for the fork and the chain tooling.
//!
//! Values start from [`SandboxConfig::default`], are overridden by environment
//! variables in [`SandboxConfig::from_env`], and the CLI layers its flags on top.

use serde::{Deserialize, Serialize};

/// Default local port the fork listens on.
pub const DEFAULT_FORK_PORT: u16 = 9996;

/// Line fragment printed by the fork launcher once it accepts connections.
pub const DEFAULT_READY_MARKER: &str = "Listening on";

/// Environment passed to every chain-tool process so nightly-build banners
/// do not land on stderr.
pub const TOOL_ENV: &[(&str, &str)] = &[("FOUNDRY_DISABLE_NIGHTLY_WARNING", "true")];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxConfig {
    pub fork_host: String,
    pub fork_port: u16,
    /// Fork launcher binary (anvil-compatible).
    pub anvil_bin: String,
    /// Chain client binary (cast-compatible).
    pub cast_bin: String,
    pub ready_marker: String,
    /// Install the chain-family fixture contract during setup.
    pub inject_fixtures: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            fork_host: "127.0.0.1".to_string(),
            fork_port: DEFAULT_FORK_PORT,
            anvil_bin: "anvil".to_string(),
            cast_bin: "cast".to_string(),
            ready_marker: DEFAULT_READY_MARKER.to_string(),
            inject_fixtures: true,
        }
    }
}

impl SandboxConfig {
    /// Defaults overridden by `FORK_SANDBOX_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = lookup("FORK_SANDBOX_PORT").and_then(|v| v.trim().parse().ok()) {
            self.fork_port = port;
        }
        if let Some(bin) = lookup("FORK_SANDBOX_ANVIL").filter(|v| !v.trim().is_empty()) {
            self.anvil_bin = bin;
        }
        if let Some(bin) = lookup("FORK_SANDBOX_CAST").filter(|v| !v.trim().is_empty()) {
            self.cast_bin = bin;
        }
        if let Some(skip) = lookup("FORK_SANDBOX_SKIP_FIXTURES") {
            self.inject_fixtures = !matches!(skip.trim(), "1" | "true" | "yes");
        }
        self
    }

    /// HTTP endpoint of the local fork.
    pub fn fork_endpoint(&self) -> String {
        format!("http://{}:{}", self.fork_host, self.fork_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_endpoint_uses_fixed_port() {
        let config = SandboxConfig::default();
        assert_eq!(config.fork_endpoint(), "http://127.0.0.1:9996");
        assert!(config.inject_fixtures);
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("FORK_SANDBOX_PORT", "not-a-port"),
            ("FORK_SANDBOX_CAST", "/opt/foundry/cast"),
            ("FORK_SANDBOX_SKIP_FIXTURES", "1"),
        ]
        .into_iter()
        .collect();
        let config = SandboxConfig::default()
            .with_env_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.fork_port, DEFAULT_FORK_PORT);
        assert_eq!(config.cast_bin, "/opt/foundry/cast");
        assert_eq!(config.anvil_bin, "anvil");
        assert!(!config.inject_fixtures);
    }
}
