//! Batch technical-indicator computation over a daily close series.
//!
//! Every function returns one `Option<f64>` cell per input bar. Cells
//! without enough trailing history are `None` — absence is explicit and
//! never encoded as zero or NaN, so it cannot leak into scaling or
//! inference. A series shorter than an indicator's lookback yields an
//! all-`None` column of the same length.
//!
//! All computation is pure and deterministic for a given input series.

use crate::config::PredictorConfig;
use crate::domain::feature_registry::Feature;
use ta::Next;
use ta::indicators::{BollingerBands, MovingAverageConvergenceDivergence, SimpleMovingAverage};

/// Simple trailing arithmetic mean of the last `window` closes.
///
/// Defined from index `window - 1` onward. Panics if `window` is zero;
/// window sizes are validated at configuration time.
pub fn moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut sma = SimpleMovingAverage::new(window).expect("window must be non-zero");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let value = sma.next(close);
            (i + 1 >= window).then_some(value)
        })
        .collect()
}

/// Wilder's RSI: seed averages are plain means of the first `window`
/// gains/losses, then smoothed as `(prev * (window-1) + current) / window`.
///
/// Needs `window` deltas, so the first `window` cells are `None`. When the
/// average loss is zero the RSI is exactly 100 — not NaN or infinity.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    assert!(window > 0, "window must be non-zero");
    let n = closes.len();
    let mut out = vec![None; n];
    if n < window + 1 {
        return out;
    }

    let period = window as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=window {
        let delta = closes[i] - closes[i - 1];
        if delta >= 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period;
    avg_loss /= period;
    out[window] = Some(rsi_value(avg_gain, avg_loss));

    for i in window + 1..n {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (period - 1.0) + gain) / period;
        avg_loss = (avg_loss * (period - 1.0) + loss) / period;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// MACD = EMA(fast) − EMA(slow); signal = EMA(signal) of the MACD line;
/// histogram = MACD − signal.
///
/// The line needs the slow EMA, so it is absent before index `slow - 1`;
/// signal and histogram additionally need `signal` MACD values and are
/// absent before index `slow + signal - 2`.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    assert!(fast > 0 && fast < slow, "MACD fast period must be shorter than slow");
    assert!(signal > 0, "MACD signal period must be non-zero");

    let mut indicator = MovingAverageConvergenceDivergence::new(fast, slow, signal)
        .expect("MACD periods validated above");
    let line_start = slow - 1;
    let signal_start = slow + signal - 2;

    let mut series = MacdSeries::default();
    for (i, &close) in closes.iter().enumerate() {
        let out = indicator.next(close);
        series.line.push((i >= line_start).then_some(out.macd));
        series.signal.push((i >= signal_start).then_some(out.signal));
        series
            .histogram
            .push((i >= signal_start).then_some(out.histogram));
    }
    series
}

/// Bollinger bands around a `window`-bar SMA center.
#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub width: Vec<Option<f64>>,
}

/// Bands at center ± k·stddev(window); `width` is the band spread
/// (upper − lower). Absent before index `window - 1`.
pub fn bollinger(closes: &[f64], window: usize, k: f64) -> BollingerSeries {
    let mut indicator = BollingerBands::new(window, k).expect("window must be non-zero");
    let mut series = BollingerSeries::default();
    for (i, &close) in closes.iter().enumerate() {
        let out = indicator.next(close);
        let defined = i + 1 >= window;
        series.upper.push(defined.then_some(out.upper));
        series.lower.push(defined.then_some(out.lower));
        series.width.push(defined.then_some(out.upper - out.lower));
    }
    series
}

/// Per-bar indicator columns for one input series. Column lengths always
/// equal the input length.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub ma_fast: Vec<Option<f64>>,
    pub ma_slow: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
    pub bollinger: BollingerSeries,
}

impl IndicatorSeries {
    /// Column backing a model feature. `Close` rows are always present.
    pub fn feature_column(&self, feature: Feature, closes: &[f64]) -> Vec<Option<f64>> {
        match feature {
            Feature::Close => closes.iter().map(|&c| Some(c)).collect(),
            Feature::Rsi => self.rsi.clone(),
            Feature::MacdHist => self.macd.histogram.clone(),
            Feature::BbWidth => self.bollinger.width.clone(),
        }
    }
}

/// Computes the full indicator set with the windows fixed at
/// construction time.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    ma_fast_window: usize,
    ma_slow_window: usize,
    rsi_window: usize,
    macd_fast: usize,
    macd_slow: usize,
    macd_signal: usize,
    bb_window: usize,
    bb_k: f64,
}

impl IndicatorEngine {
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            ma_fast_window: config.ma_fast_window,
            ma_slow_window: config.ma_slow_window,
            rsi_window: config.rsi_window,
            macd_fast: config.macd_fast,
            macd_slow: config.macd_slow,
            macd_signal: config.macd_signal,
            bb_window: config.bb_window,
            bb_k: config.bb_k,
        }
    }

    pub fn compute(&self, closes: &[f64]) -> IndicatorSeries {
        IndicatorSeries {
            ma_fast: moving_average(closes, self.ma_fast_window),
            ma_slow: moving_average(closes, self.ma_slow_window),
            rsi: rsi(closes, self.rsi_window),
            macd: macd(closes, self.macd_fast, self.macd_slow, self.macd_signal),
            bollinger: bollinger(closes, self.bb_window, self.bb_k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn sma_marks_warmup_absent_and_keeps_length() {
        let closes = ramp(10);
        let out = moving_average(&closes, 4);
        assert_eq!(out.len(), closes.len());
        assert!(out[..3].iter().all(Option::is_none));
        assert!(out[3..].iter().all(Option::is_some));
        // Mean of 100..=103
        assert!((out[3].unwrap() - 101.5).abs() < 1e-9);
        // Mean of 106..=109
        assert!((out[9].unwrap() - 107.5).abs() < 1e-9);
    }

    #[test]
    fn sma_on_short_series_is_all_absent() {
        let out = moving_average(&ramp(5), 10);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_stays_bounded() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
            .collect();
        let out = rsi(&closes, 14);
        assert_eq!(out.len(), closes.len());
        assert!(out[..14].iter().all(Option::is_none));
        for value in out[14..].iter().flatten() {
            assert!((0.0..=100.0).contains(value), "RSI out of range: {}", value);
        }
    }

    #[test]
    fn rsi_is_hundred_without_losses() {
        let out = rsi(&ramp(30), 14);
        for value in out[14..].iter().flatten() {
            assert_eq!(*value, 100.0);
        }
    }

    #[test]
    fn rsi_short_series_is_all_absent() {
        let out = rsi(&ramp(14), 14);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn macd_warmup_masks_line_then_signal() {
        let closes = ramp(50);
        let series = macd(&closes, 12, 26, 9);
        assert_eq!(series.line.len(), 50);
        assert!(series.line[..25].iter().all(Option::is_none));
        assert!(series.line[25].is_some());
        assert!(series.histogram[..33].iter().all(Option::is_none));
        assert!(series.histogram[33].is_some());
        // histogram = line − signal wherever all three are defined
        for i in 33..50 {
            let (line, signal, hist) = (
                series.line[i].unwrap(),
                series.signal[i].unwrap(),
                series.histogram[i].unwrap(),
            );
            assert!((hist - (line - signal)).abs() < 1e-9);
        }
    }

    #[test]
    fn bollinger_orders_bands() {
        let closes: Vec<f64> = (0..30)
            .map(|i| 100.0 + (i as f64 * 1.3).cos() * 4.0)
            .collect();
        let series = bollinger(&closes, 20, 2.0);
        assert!(series.upper[..19].iter().all(Option::is_none));
        for i in 19..30 {
            let upper = series.upper[i].unwrap();
            let lower = series.lower[i].unwrap();
            assert!(upper >= lower);
            assert!((series.width[i].unwrap() - (upper - lower)).abs() < 1e-9);
        }
    }

    #[test]
    fn compute_is_deterministic() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.9).sin()).collect();
        let engine = IndicatorEngine::new(&PredictorConfig::default());
        let a = engine.compute(&closes);
        let b = engine.compute(&closes);
        assert_eq!(a.rsi, b.rsi);
        assert_eq!(a.macd.histogram, b.macd.histogram);
        assert_eq!(a.ma_fast, b.ma_fast);
    }
}
