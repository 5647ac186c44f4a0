//! Persisted test-case document.
//!
//! A test case is a JSON file holding the upstream RPC source and an ordered list
//! of steps. The simulation rewrites the whole file after every step, so the model
//! must round-trip everything it loads, including step types it does not know.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// RPC source suggested for freshly created test cases.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub config: TestCaseConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseConfig {
    pub rpc_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(flatten)]
    pub action: StepAction,
}

/// Step payload: a recognized kind, or anything else preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StepAction {
    Known(StepKind),
    Unknown(UnknownStep),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Empty,
    Transaction(TransactionStep),
    Transfer(TransferStep),
    Approve(ApproveStep),
    SetBalance(SetBalanceStep),
    DeployContract(DeployContractStep),
    CheckBalance(CheckBalanceStep),
    CheckTokenBalance(CheckTokenBalanceStep),
    Wait(WaitStep),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionStep {
    pub from: String,
    pub to: String,
    pub signature: String,
    /// Whitespace-separated call arguments, passed through as separate tokens.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferStep {
    pub from: String,
    pub to: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApproveStep {
    pub from: String,
    /// Token contract.
    pub to: String,
    pub spender: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetBalanceStep {
    pub address: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeployContractStep {
    pub from: String,
    pub deployment_bytecode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckBalanceStep {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckTokenBalanceStep {
    pub token: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitStep {
    pub seconds: Seconds,
}

/// Wait duration as authored: a JSON number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Seconds {
    Number(serde_json::Number),
    Text(String),
}

impl Seconds {
    /// Whole non-negative seconds, if the authored value is one.
    pub fn whole_seconds(&self) -> Option<u64> {
        match self {
            Self::Number(number) => number.as_u64(),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{}", number),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A step whose `type` is not recognized, or whose fields do not match its type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnknownStep {
    #[serde(rename = "type", default)]
    pub type_tag: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl UnknownStep {
    /// Why a step carrying a recognized `type` did not parse as that kind.
    ///
    /// `None` when the tag itself is unrecognized.
    pub fn malformed_reason(&self) -> Option<String> {
        if !StepKind::TYPE_TAGS.contains(&self.type_tag.as_str()) {
            return None;
        }
        let mut fields = self.fields.clone();
        fields.insert(
            "type".to_string(),
            serde_json::Value::String(self.type_tag.clone()),
        );
        let err = serde_json::from_value::<StepKind>(serde_json::Value::Object(fields)).err()?;
        Some(format!("invalid {} step: {}", self.type_tag, err))
    }
}

impl StepKind {
    pub const TYPE_TAGS: [&'static str; 9] = [
        "empty",
        "transaction",
        "transfer",
        "approve",
        "set_balance",
        "deploy_contract",
        "check_balance",
        "check_token_balance",
        "wait",
    ];

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Transaction(_) => "transaction",
            Self::Transfer(_) => "transfer",
            Self::Approve(_) => "approve",
            Self::SetBalance(_) => "set_balance",
            Self::DeployContract(_) => "deploy_contract",
            Self::CheckBalance(_) => "check_balance",
            Self::CheckTokenBalance(_) => "check_token_balance",
            Self::Wait(_) => "wait",
        }
    }
}

impl Step {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            status: None,
            trace: None,
            result: None,
            action: StepAction::Known(kind),
        }
    }

    pub fn kind(&self) -> Option<&StepKind> {
        match &self.action {
            StepAction::Known(kind) => Some(kind),
            StepAction::Unknown(_) => None,
        }
    }

    pub fn type_tag(&self) -> &str {
        match &self.action {
            StepAction::Known(kind) => kind.type_tag(),
            StepAction::Unknown(unknown) => &unknown.type_tag,
        }
    }

    /// Parse problem of a step whose `type` is known but whose fields are not.
    pub fn malformed_reason(&self) -> Option<String> {
        match &self.action {
            StepAction::Known(_) => None,
            StepAction::Unknown(unknown) => unknown.malformed_reason(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == Some(StepStatus::Failed)
    }

    /// Record an attempt outcome. Empty trace/result strings leave the field untouched.
    pub fn record(&mut self, status: StepStatus, trace: Option<String>, result: Option<String>) {
        self.status = Some(status);
        if let Some(trace) = trace.filter(|t| !t.is_empty()) {
            self.trace = Some(trace);
        }
        if let Some(result) = result.filter(|r| !r.is_empty()) {
            self.result = Some(result);
        }
    }

    pub fn clear_run_state(&mut self) {
        self.status = None;
        self.trace = None;
        self.result = None;
    }
}

impl TestCase {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            config: TestCaseConfig {
                rpc_url: rpc_url.into(),
            },
            steps: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read test case {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid test case JSON in {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize test case")
    }

    /// Rewrite the whole document. Not atomic: a crash mid-write can truncate the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write test case {}", path.display()))
    }

    /// Strip status, trace and result from every step.
    pub fn clear_run_state(&mut self) {
        self.steps.iter_mut().for_each(Step::clear_run_state);
    }

    /// Insert an empty placeholder step at `index` (clamped to the end).
    pub fn add_empty_step(&mut self, index: usize) {
        let name = format!("Empty Step {}", self.steps.len() + 1);
        let index = index.min(self.steps.len());
        self.steps.insert(index, Step::new(name, StepKind::Empty));
    }

    pub fn delete_step(&mut self, index: usize) -> Option<Step> {
        if index >= self.steps.len() {
            return None;
        }
        let removed = self.steps.remove(index);
        self.clear_run_state();
        Some(removed)
    }

    pub fn duplicate_step(&mut self, index: usize) -> bool {
        let Some(original) = self.steps.get(index) else {
            return false;
        };
        let mut copy = original.clone();
        copy.name = format!("{} (Copy)", original.name);
        self.steps.insert(index + 1, copy);
        self.clear_run_state();
        true
    }

    /// Move a step; out-of-range indices leave the document unchanged.
    pub fn move_step(&mut self, from: usize, to: usize) -> bool {
        if from >= self.steps.len() || to >= self.steps.len() {
            return false;
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        self.clear_run_state();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "config": { "rpcUrl": "https://fork-source" },
  "steps": [
    { "type": "transfer", "name": "fund bob", "from": "0xA", "to": "0xB", "value": "1 ether",
      "status": "failed", "trace": "old", "result": "old" },
    { "type": "deploy_contract", "name": "deploy", "from": "0xA", "deploymentBytecode": "0x6080" },
    { "type": "wait", "name": "a day", "seconds": 86400 },
    { "type": "teleport", "name": "mystery", "destination": "mars" }
  ]
}"#;

    #[test]
    fn parses_known_and_unknown_steps() {
        let case = TestCase::from_json_str(SAMPLE).expect("parse sample");
        assert_eq!(case.config.rpc_url, "https://fork-source");
        assert_eq!(case.steps.len(), 4);

        assert_eq!(case.steps[0].status, Some(StepStatus::Failed));
        match case.steps[1].kind() {
            Some(StepKind::DeployContract(deploy)) => {
                assert_eq!(deploy.deployment_bytecode, "0x6080")
            }
            other => panic!("unexpected kind {:?}", other),
        }
        match case.steps[2].kind() {
            Some(StepKind::Wait(wait)) => assert_eq!(wait.seconds.whole_seconds(), Some(86400)),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(case.steps[3].kind().is_none());
        assert_eq!(case.steps[3].type_tag(), "teleport");
    }

    #[test]
    fn unknown_steps_survive_a_rewrite() {
        let case = TestCase::from_json_str(SAMPLE).expect("parse sample");
        let value: serde_json::Value =
            serde_json::from_str(&case.to_json_string().expect("serialize")).expect("json");
        let mystery = &value["steps"][3];
        assert_eq!(mystery["type"], "teleport");
        assert_eq!(mystery["destination"], "mars");
        assert_eq!(mystery["name"], "mystery");
        assert_eq!(value["steps"][1]["deploymentBytecode"], "0x6080");
        assert_eq!(value["config"]["rpcUrl"], "https://fork-source");
        assert_eq!(value["steps"][2]["seconds"], 86400);
    }

    #[test]
    fn wait_seconds_accept_strings_and_reject_fractions() {
        let text: WaitStep = serde_json::from_str(r#"{"seconds":" 60 "}"#).expect("text");
        assert_eq!(text.seconds.whole_seconds(), Some(60));
        let fraction: WaitStep = serde_json::from_str(r#"{"seconds":1.5}"#).expect("fraction");
        assert_eq!(fraction.seconds.whole_seconds(), None);
        let negative: WaitStep = serde_json::from_str(r#"{"seconds":-5}"#).expect("negative");
        assert_eq!(negative.seconds.to_string(), "-5");
        assert_eq!(negative.seconds.whole_seconds(), None);
    }

    #[test]
    fn known_type_with_missing_field_is_reported_as_malformed() {
        let case = TestCase::from_json_str(
            r#"{ "config": { "rpcUrl": "x" }, "steps": [
                { "type": "transfer", "name": "half", "from": "0xA", "to": "0xB" },
                { "type": "teleport", "name": "mystery" }
            ] }"#,
        )
        .expect("parse");

        let reason = case.steps[0].malformed_reason().expect("malformed transfer");
        assert!(reason.starts_with("invalid transfer step: missing field `value`"));
        assert_eq!(case.steps[0].type_tag(), "transfer");
        assert!(case.steps[1].malformed_reason().is_none());

        let value = serde_json::to_value(&case).expect("serialize");
        assert_eq!(
            value["steps"][0],
            serde_json::json!({ "type": "transfer", "name": "half", "from": "0xA", "to": "0xB" })
        );
    }

    #[test]
    fn empty_steps_serialize_with_type_tag_only() {
        let mut case = TestCase::new(DEFAULT_RPC_URL);
        case.add_empty_step(0);
        let value = serde_json::to_value(&case).expect("serialize");
        assert_eq!(
            value["steps"][0],
            serde_json::json!({ "name": "Empty Step 1", "type": "empty" })
        );
    }

    #[test]
    fn record_skips_empty_payloads() {
        let mut step = Step::new("noop", StepKind::Empty);
        step.record(StepStatus::Success, Some(String::new()), None);
        assert_eq!(step.status, Some(StepStatus::Success));
        assert!(step.trace.is_none());
        assert!(step.result.is_none());
    }

    #[test]
    fn clear_run_state_strips_every_step() {
        let mut case = TestCase::from_json_str(SAMPLE).expect("parse sample");
        case.steps[1].record(StepStatus::Success, Some("t".into()), Some("r".into()));
        case.clear_run_state();
        assert!(case
            .steps
            .iter()
            .all(|s| s.status.is_none() && s.trace.is_none() && s.result.is_none()));
    }

    #[test]
    fn document_operations_reset_run_state() {
        let mut case = TestCase::from_json_str(SAMPLE).expect("parse sample");
        assert!(case.duplicate_step(0));
        assert_eq!(case.steps[1].name, "fund bob (Copy)");
        assert!(case.steps.iter().all(|s| s.status.is_none()));

        assert!(case.move_step(1, 4));
        assert_eq!(case.steps[4].name, "fund bob (Copy)");
        assert!(!case.move_step(0, 99));

        let removed = case.delete_step(4).expect("removed");
        assert_eq!(removed.name, "fund bob (Copy)");
        assert!(case.delete_step(42).is_none());
        assert_eq!(case.steps.len(), 4);
    }

    #[test]
    fn add_empty_step_clamps_index() {
        let mut case = TestCase::new(DEFAULT_RPC_URL);
        case.add_empty_step(0);
        case.add_empty_step(10);
        assert_eq!(case.steps[1].name, "Empty Step 2");
        assert_eq!(case.steps[1].type_tag(), "empty");
    }
}
