//! Display formatting for ranking table cells.

use serde_json::Value;

/// Maps a raw record value to the string shown in a table cell. Never fails.
pub fn format_cell_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                number
                    .as_f64()
                    .map(format_number)
                    .unwrap_or_else(|| number.to_string())
            }
        }
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| String::new())
        }
    }
}

/// Integral values print without a fraction, other finite values with two
/// decimals, ties rounding away from zero. Non-finite values use `NaN`,
/// `Infinity` and `-Infinity`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        return format_integral(value);
    }
    format_two_decimals(value)
}

const EXPONENT_THRESHOLD: f64 = 1e21;

/// Shortest round-trip digits; magnitudes from 1e21 up switch to
/// exponent form with an explicit sign (`1e+21`).
fn format_integral(value: f64) -> String {
    if value.abs() < EXPONENT_THRESHOLD {
        return format!("{value}");
    }
    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => scientific,
    }
}

/// Rounds half away from zero on the exact binary value. The formatter
/// already rounds to nearest; only exact ties (odd multiples of 1/8)
/// need the upward pick.
fn format_two_decimals(value: f64) -> String {
    let magnitude = value.abs();
    let eighths = magnitude * 8.0;
    let is_tie = eighths.fract() == 0.0 && (magnitude * 4.0).fract() != 0.0;
    if !is_tie {
        return format!("{value:.2}");
    }

    // Odd eighths have three decimals ending in 5, so this product is exact.
    let cents = (magnitude * 100.0).ceil() as u64;
    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
