//! Bar-to-bar change in closing price.
//!
//! `change[i] = close[i] - close[i-1]`; the first bar of a group has no change.

pub fn calculate_change_in_price(closes: &[f64]) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if i == 0 {
            values.push(None);
        } else {
            values.push(Some(closes[i] - closes[i - 1]));
        }
    }
    values
}
