//! Oscillators over closing prices.
//!
//! The series carries closes only, so the trailing-window high and low are
//! the window's maximum and minimum close.

use super::finite;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{Maximum, Minimum};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Relative Strength Index from simple average gain/loss over the last `period` deltas.
///
/// Returns 100 when the average loss is zero, flat windows included.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    finite(100.0 - 100.0 / (1.0 + rs)).map(|v| v.clamp(0.0, 100.0))
}

/// Rolling (low, high) of the trailing `period` closes after each price
fn rolling_bounds(prices: &[f64], period: usize) -> Option<Vec<(f64, f64)>> {
    let mut low = Minimum::new(period).ok()?;
    let mut high = Maximum::new(period).ok()?;
    Some(
        prices
            .iter()
            .map(|&price| (low.next(price), high.next(price)))
            .collect(),
    )
}

fn percent_k(close: f64, low: f64, high: f64) -> f64 {
    let range = high - low;
    if range <= f64::EPSILON {
        50.0
    } else {
        ((close - low) / range * 100.0).clamp(0.0, 100.0)
    }
}

/// Fast stochastic %K with %D as the SMA of the last `smoothing` %K values
pub fn stochastic(prices: &[f64], period: usize, smoothing: usize) -> Option<Stochastic> {
    if period == 0 || smoothing == 0 || prices.len() < period + smoothing - 1 {
        return None;
    }

    let bounds = rolling_bounds(prices, period)?;
    let start = prices.len() - smoothing;
    let ks: Vec<f64> = prices[start..]
        .iter()
        .zip(&bounds[start..])
        .map(|(&close, &(low, high))| percent_k(close, low, high))
        .collect();

    let k = finite(ks[ks.len() - 1])?;
    let d = finite(ks.iter().sum::<f64>() / smoothing as f64)?;

    Some(Stochastic {
        k: k.clamp(0.0, 100.0),
        d: d.clamp(0.0, 100.0),
    })
}

/// Williams %R in [-100, 0]
pub fn williams_r(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let (low, high) = *rolling_bounds(prices, period)?.last()?;
    let close = prices[prices.len() - 1];
    let range = high - low;

    if range <= f64::EPSILON {
        return Some(-50.0);
    }

    finite((high - close) / range * -100.0).map(|v| v.clamp(-100.0, 0.0))
}

/// Commodity Channel Index with close as typical price
pub fn cci(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let mean_deviation = window.iter().map(|p| (p - mean).abs()).sum::<f64>() / period as f64;

    if mean_deviation <= f64::EPSILON {
        return Some(0.0);
    }

    let typical = window[window.len() - 1];
    finite((typical - mean) / (0.015 * mean_deviation)).map(|v| v.clamp(-500.0, 500.0))
}
