//! Shared utilities for the diamond analytics pipeline.
//!
//! This module contains the small numeric and string helpers used across
//! ingestion, cleaning and analysis.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 10] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a", "-",
];

/// Characters stripped from numeric cells before parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 3] = ['$', '€', ' '];

/// Check if a string is an error/missing value marker.
///
/// # Example
///
/// ```rust,ignore
/// use diamond_analytics::utils::is_error_marker;
///
/// assert!(is_error_marker("N/A"));
/// assert!(!is_error_marker("0.5"));
/// ```
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Parse a numeric cell.
///
/// Currency symbols and inner spaces are removed. When the table is not
/// comma-separated, a single decimal comma (`0,5`) is accepted as well.
pub fn parse_numeric_string(s: &str, allow_decimal_comma: bool) -> Option<f64> {
    let mut cleaned = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        cleaned = cleaned.replace(c, "");
    }
    if cleaned.is_empty() {
        return None;
    }

    let parsed = match cleaned.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) if allow_decimal_comma && cleaned.matches(',').count() == 1 => {
            cleaned.replace(',', ".").parse::<f64>().ok()
        }
        Err(_) => None,
    };
    parsed.filter(|value| value.is_finite())
}

/// Parse an identifier cell. Accepts integral floats such as `12.0`.
pub fn parse_identifier(s: &str) -> Option<u64> {
    let trimmed = s.trim();
    if let Ok(id) = trimmed.parse::<u64>() {
        return Some(id);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
        .map(|value| value as u64)
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Median of a slice. Even-length input averages the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean of a slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

// =============================================================================
// Hashing
// =============================================================================

/// Hash a value with a fixed-key hasher.
///
/// Stable within a process, which is all the in-memory cache needs.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Tests
// =============================================================================
