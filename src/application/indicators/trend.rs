use super::finite;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{
    ExponentialMovingAverage, MovingAverageConvergenceDivergence, SimpleMovingAverage,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Simple moving average of the trailing `period` prices
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let mut indicator = SimpleMovingAverage::new(period).ok()?;
    let mut last = None;
    for &price in prices {
        last = Some(indicator.next(price));
    }
    last.and_then(finite)
}

/// Exponential moving average over the whole series, seeded with the first price
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period {
        return None;
    }
    let mut indicator = ExponentialMovingAverage::new(period).ok()?;
    let mut last = None;
    for &price in prices {
        last = Some(indicator.next(price));
    }
    last.and_then(finite)
}

/// MACD line, signal line and histogram.
///
/// Needs `slow + signal - 1` points before the signal line carries information.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || slow <= fast || signal == 0 || prices.len() < slow + signal - 1 {
        return None;
    }

    let mut indicator = MovingAverageConvergenceDivergence::new(fast, slow, signal).ok()?;
    let mut output = None;
    for &price in prices {
        output = Some(indicator.next(price));
    }

    let output = output?;
    Some(Macd {
        macd: finite(output.macd)?,
        signal: finite(output.signal)?,
        histogram: finite(output.histogram)?,
    })
}

/// Wilder-smoothed directional movement state.
///
/// With closes only, the true range of a step is the absolute close-to-close
/// move and directional movement is its signed part.
struct WilderAdx {
    period: usize,
    prev_close: Option<f64>,
    tr_sum: f64,
    plus_dm_sum: f64,
    minus_dm_sum: f64,
    tr_smooth: f64,
    plus_dm_smooth: f64,
    minus_dm_smooth: f64,
    adx_smooth: f64,
    count: usize,
}

impl WilderAdx {
    fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            tr_sum: 0.0,
            plus_dm_sum: 0.0,
            minus_dm_sum: 0.0,
            tr_smooth: 0.0,
            plus_dm_smooth: 0.0,
            minus_dm_smooth: 0.0,
            adx_smooth: 0.0,
            count: 0,
        }
    }

    fn next(&mut self, close: f64) -> f64 {
        let Some(prev_close) = self.prev_close.replace(close) else {
            return 0.0;
        };

        let up_move = close - prev_close;
        let down_move = prev_close - close;
        let tr = up_move.abs();
        let plus_dm = if up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > 0.0 { down_move } else { 0.0 };

        self.count += 1;
        let n = self.period as f64;

        if self.count <= self.period {
            self.tr_sum += tr;
            self.plus_dm_sum += plus_dm;
            self.minus_dm_sum += minus_dm;
            if self.count == self.period {
                self.tr_smooth = self.tr_sum;
                self.plus_dm_smooth = self.plus_dm_sum;
                self.minus_dm_smooth = self.minus_dm_sum;
            }
        } else {
            self.tr_smooth = self.tr_smooth - (self.tr_smooth / n) + tr;
            self.plus_dm_smooth = self.plus_dm_smooth - (self.plus_dm_smooth / n) + plus_dm;
            self.minus_dm_smooth = self.minus_dm_smooth - (self.minus_dm_smooth / n) + minus_dm;
        }

        if self.count < self.period {
            return 0.0;
        }

        let dx = if self.tr_smooth > 0.0 {
            let plus_di = 100.0 * self.plus_dm_smooth / self.tr_smooth;
            let minus_di = 100.0 * self.minus_dm_smooth / self.tr_smooth;
            let sum_di = plus_di + minus_di;
            if sum_di > 0.0 {
                100.0 * (plus_di - minus_di).abs() / sum_di
            } else {
                0.0
            }
        } else {
            0.0
        };

        if self.count == self.period {
            self.adx_smooth = dx;
        } else {
            self.adx_smooth = (self.adx_smooth * (n - 1.0) + dx) / n;
        }
        self.adx_smooth
    }
}

/// Average Directional Index in [0, 100]; needs `2 * period` points
pub fn adx(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < 2 * period {
        return None;
    }

    let mut state = WilderAdx::new(period);
    let mut value = 0.0;
    for &price in prices {
        value = state.next(price);
    }
    finite(value).map(|v| v.clamp(0.0, 100.0))
}
