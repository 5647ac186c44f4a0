//! Exact native-currency amount handling.
//!
//! Amounts travel as strings: either a bare base-unit integer (`"42"`) or a
//! decimal with a unit suffix (`"1.5 ether"`). All arithmetic goes through
//! [`BigUint`] so nothing is rounded.

use anyhow::{anyhow, Result};
use num_bigint::BigUint;

/// Decimals of the native currency.
pub const NATIVE_DECIMALS: usize = 18;

const ETHER_SUFFIXES: &[&str] = &["ether", "eth"];

/// Convert an amount string to its base-unit (wei) integer string.
///
/// A value ending in an ether unit is split into whole and fractional parts;
/// the fraction is right-padded (or truncated) to exactly 18 digits.
pub fn to_base_units(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();

    let Some(number) = ETHER_SUFFIXES
        .iter()
        .find_map(|suffix| lowered.strip_suffix(suffix))
        .map(str::trim)
    else {
        ensure_digits(trimmed, value)?;
        return Ok(trimmed.to_string());
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(anyhow!("invalid amount `{}`: missing number", value));
    }
    let whole = if whole.is_empty() { "0" } else { whole };
    ensure_digits(whole, value)?;
    if !fraction.is_empty() {
        ensure_digits(fraction, value)?;
    }

    let mut padded: String = fraction.chars().take(NATIVE_DECIMALS).collect();
    while padded.len() < NATIVE_DECIMALS {
        padded.push('0');
    }

    let digits = format!("{whole}{padded}");
    let wei = BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| anyhow!("invalid amount `{}`", value))?;
    Ok(wei.to_str_radix(10))
}

fn ensure_digits(part: &str, original: &str) -> Result<()> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!(
            "invalid amount `{}`: expected an integer or `<decimal> ether`",
            original
        ));
    }
    Ok(())
}

/// Encode a base-10 integer string as a JSON-RPC quantity (`0x`-prefixed hex).
pub fn to_hex_quantity(decimal: &str) -> Result<String> {
    let value = BigUint::parse_bytes(decimal.trim().as_bytes(), 10)
        .ok_or_else(|| anyhow!("invalid base-unit integer `{}`", decimal))?;
    Ok(format!("0x{}", value.to_str_radix(16)))
}

/// Parse an integer printed by the chain client: `0x`-prefixed hex or plain decimal.
/// Trailing annotations (`1000 [1e3]`) are ignored.
pub fn parse_quantity(raw: &str) -> Result<BigUint> {
    let token = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("empty numeric output"))?;
    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some("") => Some(BigUint::default()),
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(token.as_bytes(), 10),
    };
    parsed.ok_or_else(|| anyhow!("unparseable numeric output `{}`", raw.trim()))
}

/// Render a base-unit amount as `whole.fraction UNIT (raw wei)`.
pub fn format_units(raw: &BigUint, decimals: u32, unit: &str) -> String {
    if decimals == 0 {
        return format!("{raw} {unit} ({raw} wei)");
    }
    let divisor = BigUint::from(10u32).pow(decimals);
    let whole = raw / &divisor;
    let fraction = (raw % &divisor).to_str_radix(10);
    format!(
        "{whole}.{fraction:0>width$} {unit} ({raw} wei)",
        width = decimals as usize
    )
}

/// Human phrase for a number of seconds: `1 day, 2 hours, 5 seconds`.
pub fn format_duration(total_seconds: u64) -> String {
    let components = [
        (total_seconds / 86_400, "day"),
        ((total_seconds % 86_400) / 3_600, "hour"),
        ((total_seconds % 3_600) / 60, "minute"),
    ];

    let mut parts: Vec<String> = components
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| plural(*count, label))
        .collect();

    let seconds = total_seconds % 60;
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(", ")
}

fn plural(count: u64, label: &str) -> String {
    if count == 1 {
        format!("{count} {label}")
    } else {
        format!("{count} {label}s")
    }
}
