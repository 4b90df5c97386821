//! Simple Moving Average over closing prices.
//!
//! Rolling mean of the last `n` closes. Warmup: first (n-1) bars are missing.

pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let mut values = Vec::with_capacity(closes.len());
    let mut sum = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        sum += close;
        if i >= period {
            sum -= closes[i - period];
        }
        if i + 1 < period {
            values.push(None);
        } else {
            values.push(Some(sum / period as f64));
        }
    }

    values
}
