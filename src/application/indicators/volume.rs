use super::finite;

/// On-Balance Volume: running sum of volume signed by the close-to-close move.
///
/// Starts at zero on the first point; needs two points and equal-length inputs.
pub fn obv(prices: &[f64], volumes: &[f64]) -> Option<f64> {
    if prices.len() < 2 || prices.len() != volumes.len() {
        return None;
    }

    let mut total = 0.0;
    for i in 1..prices.len() {
        if prices[i] > prices[i - 1] {
            total += volumes[i];
        } else if prices[i] < prices[i - 1] {
            total -= volumes[i];
        }
    }
    finite(total)
}

/// Volume-weighted average close over the trailing `period` points.
///
/// Falls back to the plain average when the window traded no volume.
pub fn vwap(prices: &[f64], volumes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period || prices.len() != volumes.len() {
        return None;
    }

    let start = prices.len() - period;
    let window_prices = &prices[start..];
    let window_volumes = &volumes[start..];

    let total_volume: f64 = window_volumes.iter().sum();
    if total_volume <= 0.0 {
        return finite(window_prices.iter().sum::<f64>() / period as f64);
    }

    let weighted: f64 = window_prices
        .iter()
        .zip(window_volumes)
        .map(|(p, v)| p * v)
        .sum();
    finite(weighted / total_volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_accumulates_signed_volume() {
        let prices = [10.0, 11.0, 10.5, 10.5, 12.0];
        let volumes = [100.0, 20.0, 5.0, 50.0, 7.0];
        assert_eq!(obv(&prices, &volumes), Some(20.0 - 5.0 + 7.0));
    }

    #[test]
    fn test_obv_requires_matching_inputs() {
        assert!(obv(&[1.0, 2.0], &[1.0]).is_none());
        assert!(obv(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let prices = [10.0, 20.0];
        let volumes = [3.0, 1.0];
        assert_eq!(vwap(&prices, &volumes, 2), Some(12.5));
    }

    #[test]
    fn test_vwap_without_volume_falls_back_to_mean() {
        assert_eq!(vwap(&[10.0, 20.0, 30.0], &[0.0, 0.0, 0.0], 2), Some(25.0));
    }
}
