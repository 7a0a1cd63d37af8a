//! Technical indicators for the per-symbol detail view.

use serde::Serialize;

pub const RSI_PERIOD: usize = 14;
const NEUTRAL_RSI: f64 = 50.0;

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Relative strength index with Wilder's smoothing.
///
/// The first average gain/loss is the plain mean over the first `period`
/// changes; each later change is folded in as
/// `avg = (avg * (period - 1) + change) / period`.
/// Returns 50 when fewer than `period + 1` closes are available and 100 when
/// the average loss is zero.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let changes: Vec<f64> = closes.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let period_f = period as f64;
    let mut avg_gain = seed.iter().map(|change| change.max(0.0)).sum::<f64>() / period_f;
    let mut avg_loss = seed.iter().map(|change| (-change).max(0.0)).sum::<f64>() / period_f;

    for change in rest {
        avg_gain = (avg_gain * (period_f - 1.0) + change.max(0.0)) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + (-change).max(0.0)) / period_f;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);
    if value.is_finite() {
        round2(value)
    } else {
        NEUTRAL_RSI
    }
}

/// Simple moving average of the last `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAverages {
    pub ma5: f64,
    pub ma20: f64,
    pub ma60: f64,
    pub ma120: f64,
}

impl MovingAverages {
    /// Averages over the latest closes. A window longer than the history
    /// falls back to the next shorter average; with fewer than five closes
    /// every average is the latest close.
    pub fn from_closes(closes: &[f64]) -> Self {
        let Some(ma5) = sma(closes, 5) else {
            let latest = closes.last().copied().unwrap_or(0.0);
            return Self {
                ma5: latest,
                ma20: latest,
                ma60: latest,
                ma120: latest,
            };
        };
        let ma20 = sma(closes, 20).unwrap_or(ma5);
        let ma60 = sma(closes, 60).unwrap_or(ma20);
        let ma120 = sma(closes, 120).unwrap_or(ma60);

        Self {
            ma5: round2(ma5),
            ma20: round2(ma20),
            ma60: round2(ma60),
            ma120: round2(ma120),
        }
    }
}

/// Price as a percentage of its 20-day average; 100 when the average is 0.
pub fn disparity(price: f64, ma20: f64) -> f64 {
    if ma20 > 0.0 {
        round2(price / ma20 * 100.0)
    } else {
        100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_is_neutral_without_enough_history() {
        assert_eq!(rsi(&[1.0; 14], RSI_PERIOD), 50.0);
        assert_eq!(rsi(&[], RSI_PERIOD), 50.0);
    }

    #[test]
    fn rsi_is_100_when_price_only_rises() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(rsi(&closes, RSI_PERIOD), 100.0);
    }

    #[test]
    fn rsi_balances_equal_gains_and_losses() {
        // Alternating +1/-1 over 14 changes gives equal seed averages.
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        assert_eq!(rsi(&closes, RSI_PERIOD), 50.0);
    }

    #[test]
    fn rsi_applies_wilder_smoothing_after_seed() {
        // Seed: 14 gains of 1 and no losses, then one loss of 14.
        let mut closes: Vec<f64> = (0..=14).map(f64::from).collect();
        closes.push(0.0);
        // avg_gain = 13/14, avg_loss = 1, rs = 13/14
        let expected = round2(100.0 - 100.0 / (1.0 + 13.0 / 14.0));
        assert_eq!(rsi(&closes, RSI_PERIOD), expected);
    }

    #[test]
    fn moving_averages_fall_back_to_shorter_windows() {
        let closes: Vec<f64> = (1..=25).map(f64::from).collect();
        let averages = MovingAverages::from_closes(&closes);
        assert_eq!(averages.ma5, 23.0);
        assert_eq!(averages.ma20, 15.5);
        assert_eq!(averages.ma60, 15.5);
        assert_eq!(averages.ma120, 15.5);
    }

    #[test]
    fn short_history_uses_latest_close() {
        let averages = MovingAverages::from_closes(&[10.0, 12.5]);
        assert_eq!(averages.ma5, 12.5);
        assert_eq!(averages.ma120, 12.5);
    }

    #[test]
    fn disparity_guards_zero_average() {
        assert_eq!(disparity(110.0, 100.0), 110.0);
        assert_eq!(disparity(110.0, 0.0), 100.0);
    }
}
