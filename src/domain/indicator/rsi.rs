//! RSI (Relative Strength Index) indicator.
//!
//! Up moves are `max(change, 0)`, down moves `max(-change, 0)`. Averages use
//! either Wilder's smoothing or an adjusted exponentially weighted mean:
//! - Wilders: first average is the simple mean of the first n changes, then
//!   avg = (prev_avg * (n-1) + current) / n. First n bars are missing.
//! - Ewma: span-n EWM of the up/down moves, valid from the first change.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_up / avg_down))
//! If avg_down == 0: RSI = 100

use crate::domain::indicator::RsiMethod;
use crate::domain::indicator::change::calculate_change_in_price;
use crate::domain::indicator::ema::{ewm_mean, span_alpha};

fn rsi_value(avg_up: f64, avg_down: f64) -> f64 {
    if avg_down == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_up / avg_down))
    }
}

pub fn calculate_rsi(closes: &[f64], period: usize, method: RsiMethod) -> Vec<Option<f64>> {
    if period == 0 || closes.len() < 2 {
        return vec![None; closes.len()];
    }

    match method {
        RsiMethod::Wilders => wilders(closes, period),
        RsiMethod::Ewma => ewma(closes, period),
    }
}

fn wilders(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(closes.len());
    values.push(None);

    let mut gains: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for gain_idx in 0..gains.len() {
        if gain_idx + 1 < period {
            values.push(None);
        } else if gain_idx + 1 == period {
            avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
            avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
            values.push(Some(rsi_value(avg_gain, avg_loss)));
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[gain_idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[gain_idx]) / period as f64;
            values.push(Some(rsi_value(avg_gain, avg_loss)));
        }
    }

    values
}

fn ewma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let changes = calculate_change_in_price(closes);
    let ups: Vec<Option<f64>> = changes.iter().map(|c| c.map(|x| x.max(0.0))).collect();
    let downs: Vec<Option<f64>> = changes.iter().map(|c| c.map(|x| (-x).max(0.0))).collect();

    let alpha = span_alpha(period);
    let avg_up = ewm_mean(&ups, alpha);
    let avg_down = ewm_mean(&downs, alpha);

    avg_up
        .into_iter()
        .zip(avg_down)
        .map(|(up, down)| Some(rsi_value(up?, down?)))
        .collect()
}
