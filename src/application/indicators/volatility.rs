use super::finite;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use ta::Next;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Position of `price` inside the bands: 0 at the lower band, 1 at the upper.
    /// Collapsed bands report the midpoint.
    pub fn percent_b(&self, price: f64) -> f64 {
        let width = self.upper - self.lower;
        if width <= f64::EPSILON {
            0.5
        } else {
            (price - self.lower) / width
        }
    }
}

/// Bollinger Bands around SMA(`period`) with `k` population standard deviations.
///
/// `upper >= middle >= lower` holds for every output, including flat windows
/// where all three collapse onto the mean.
pub fn bollinger(prices: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    if period == 0 || prices.len() < period || !k.is_finite() {
        return None;
    }

    let mut indicator = ta::indicators::BollingerBands::new(period, k.abs()).ok()?;
    let mut output = None;
    for &price in prices {
        output = Some(indicator.next(price));
    }

    let output = output?;
    let middle = finite(output.average)?;
    // Rounding in the rolling variance must not invert the bands
    let band = finite((output.upper - output.lower) / 2.0)?.max(0.0);

    Some(BollingerBands {
        upper: middle + band,
        middle,
        lower: middle - band,
    })
}

/// Simple daily returns; steps from a non-positive price are skipped
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

/// Population standard deviation of the last `window` daily returns.
///
/// Returns 0 for fewer than two returns so callers always get a usable value.
pub fn realized_volatility(prices: &[f64], window: usize) -> f64 {
    let returns = daily_returns(prices);
    if returns.len() < 2 || window < 2 {
        return 0.0;
    }
    let start = returns.len().saturating_sub(window);
    let value = returns[start..].iter().population_std_dev();
    finite(value).unwrap_or(0.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bollinger_flat_series_collapses() {
        let bands = bollinger(&[100.0; 30], 20, 2.0).unwrap();
        assert_eq!(bands.upper, 100.0);
        assert_eq!(bands.middle, 100.0);
        assert_eq!(bands.lower, 100.0);
        assert_eq!(bands.percent_b(100.0), 0.5);

        let bands = bollinger(&[100.37; 30], 20, 2.0).unwrap();
        assert_eq!(bands.upper, 100.37);
        assert_eq!(bands.middle, 100.37);
        assert_eq!(bands.lower, 100.37);
    }

    #[test]
    fn test_bollinger_uses_trailing_window() {
        let mut prices = vec![1.0; 40];
        prices.extend([10.0; 20]);
        let bands = bollinger(&prices, 20, 2.0).unwrap();
        assert!((bands.middle - 10.0).abs() < 1e-9);
        assert!((bands.upper - bands.lower).abs() < 1e-3);
    }

    #[test]
    fn test_bollinger_ordering_on_noisy_input() {
        let prices: Vec<f64> = (0..120)
            .map(|i| 50.0 + (i as f64 * 1.3).sin() * 8.0 + ((i * 7) % 5) as f64)
            .collect();
        for end in 20..prices.len() {
            let bands = bollinger(&prices[..end], 20, 2.0).unwrap();
            assert!(bands.lower <= bands.middle);
            assert!(bands.middle <= bands.upper);
        }
    }

    #[test]
    fn test_bollinger_known_values() {
        let prices = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger(&prices, 8, 2.0).unwrap();
        assert!((bands.middle - 5.0).abs() < 1e-9);
        assert!((bands.upper - 9.0).abs() < 1e-9);
        assert!((bands.lower - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_negative_k_keeps_ordering() {
        let bands = bollinger(&[1.0, 2.0, 3.0], 3, -2.0).unwrap();
        assert!(bands.upper >= bands.lower);
    }

    #[test]
    fn test_daily_returns() {
        let returns = daily_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_realized_volatility() {
        assert_eq!(realized_volatility(&[100.0; 40], 30), 0.0);
        assert_eq!(realized_volatility(&[100.0, 101.0], 30), 0.0);

        let zigzag: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect();
        assert!(realized_volatility(&zigzag, 30) > 0.05);
    }
}
