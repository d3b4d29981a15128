//! Small descriptive statistics over in-memory samples

/// Median of a slice, taking the upper middle element for even lengths.
///
/// Always returns an observed value, so a median interval is a whole number
/// of days and two very different intervals never average into a plausible one.
pub fn upper_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted[sorted.len() / 2]
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation (`stddev / |mean|`)
///
/// A zero mean gives 0 when the sample is constant and infinity otherwise, so
/// callers scoring "regularity" treat an all-zero sample as perfectly regular.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values).abs();
    let sd = std_dev(values);
    if m < f64::EPSILON {
        return if sd < f64::EPSILON { 0.0 } else { f64::INFINITY };
    }
    sd / m
}
