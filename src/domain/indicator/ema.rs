//! Exponential Moving Average indicator.
//!
//! Adjusted exponentially weighted mean: the value at bar t is
//! `sum((1-a)^i * x[t-i]) / sum((1-a)^i)` over every bar seen so far, with
//! `a = 2/(n+1)` unless an explicit smoothing factor is given. Valid from the
//! first observation; there is no SMA seed.

/// Smoothing factor for a span of `period` bars.
pub fn span_alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Adjusted EWM over a series with gaps. Missing inputs decay the weights
/// without contributing, and report the running mean once one value exists.
pub fn ewm_mean(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let decay = 1.0 - alpha;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut seen = false;

    values
        .iter()
        .map(|value| {
            numerator *= decay;
            denominator *= decay;
            if let Some(x) = value {
                numerator += x;
                denominator += 1.0;
                seen = true;
            }
            if seen {
                Some(numerator / denominator)
            } else {
                None
            }
        })
        .collect()
}

pub fn calculate_ema(closes: &[f64], alpha: f64) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = closes.iter().map(|&c| Some(c)).collect();
    ewm_mean(&values, alpha)
}
