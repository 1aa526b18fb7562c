//! Display helpers shared by the templates.
//!
//! Amounts are shown the way the transactions table always has: two
//! decimals, no currency symbol, no thousands separator. Anomalies get a
//! warning sign, everything else a check mark.

pub const ANOMALY_MARKER: &str = "⚠️";
pub const NORMAL_MARKER: &str = "✓";

/// Format an amount with exactly two decimals.
pub fn format_amount(amount: f64) -> String {
    let formatted = format!("{:.2}", amount);
    // Rounding a tiny negative value would otherwise print "-0.00".
    if formatted == "-0.00" {
        "0.00".to_string()
    } else {
        formatted
    }
}

pub fn anomaly_marker(is_anomaly: bool) -> &'static str {
    if is_anomaly {
        ANOMALY_MARKER
    } else {
        NORMAL_MARKER
    }
}

/// Human readable duration for the request log.
pub fn format_duration_ms(duration_ms: Option<i64>) -> String {
    match duration_ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{} ms", ms),
        Some(ms) => format!("{:.1} s", ms as f64 / 1000.0),
    }
}
