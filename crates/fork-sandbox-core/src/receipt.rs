//! Receipt extraction from the chain client's key/value text output.
//!
//! `cast send` prints one `key   value` pair per line. Only the transaction hash
//! and the status are needed. Parsing never fails: fields that are missing or
//! unreadable simply stay `None`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    /// Reverted, or any status text that is not `1 (success)`.
    Failure,
}

impl ReceiptStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 1,
            Self::Failure => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiptSummary {
    pub hash: Option<String>,
    pub status: Option<ReceiptStatus>,
}

impl ReceiptSummary {
    pub fn is_success(&self) -> bool {
        self.status == Some(ReceiptStatus::Success)
    }
}

const HASH_KEY: &str = "transactionHash";
const STATUS_KEY: &str = "status";
const SUCCESS_MARKER: &str = "1 (success)";

pub fn parse_receipt(output: &str) -> ReceiptSummary {
    let mut summary = ReceiptSummary::default();
    for line in output.lines() {
        if let Some(hash) = value_after_key(line, HASH_KEY) {
            summary.hash = Some(hash.to_string());
        } else if let Some(status) = value_after_key(line, STATUS_KEY) {
            summary.status = Some(if status.contains(SUCCESS_MARKER) {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Failure
            });
        }
    }
    summary
}

/// Value of a `key value` line whose first token is exactly `key`.
///
/// Keys embedded elsewhere on a line (the JSON in `logs` carries its own
/// `"transactionHash"`) are not matches.
fn value_after_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix(key)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim();
    (!value.is_empty()).then_some(value)
}
