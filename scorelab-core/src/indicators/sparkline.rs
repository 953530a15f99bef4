//! Sparkline normalization for candidate payloads.

use crate::domain::round_to;

/// Min-max scale to 0..100 at two decimals. A flat series maps to 50.0.
pub fn normalize_sparkline(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if high == low {
        return vec![50.0; values.len()];
    }
    let scale = high - low;
    values
        .iter()
        .map(|v| round_to((v - low) / scale * 100.0, 2))
        .collect()
}

/// Normalized tail of the last `length` values.
pub fn build_sparkline(values: &[f64], length: usize) -> Vec<f64> {
    let start = values.len().saturating_sub(length);
    normalize_sparkline(&values[start..])
}
