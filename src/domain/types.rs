use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One day's OHLCV record as returned by the market-data collaborator.
///
/// Bars arrive in ascending date order with no duplicate dates; gaps
/// (holidays, halts) are whatever the data source returns and are not
/// filled here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Directional signal derived from predicted vs. last close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "Up"),
            Trend::Down => write!(f, "Down"),
            Trend::Flat => write!(f, "Flat"),
        }
    }
}

/// Where the exchange rate applied to a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Live,
    Fallback,
}

/// Chart-ready series for the prediction view. All price values are
/// already converted to the response currency. Absent moving-average
/// cells stay `None` so they serialize as JSON `null` rather than zero.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub close: Vec<f64>,
    pub ma_fast: Vec<Option<f64>>,
    pub ma_slow: Vec<Option<f64>>,
}

/// Full output of the prediction path, assembled by the service and
/// handed to the HTTP layer as-is. Derived per request, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub ticker: String,
    pub currency: String,
    pub rate_source: RateSource,
    pub last_close: f64,
    pub predicted_close: f64,
    pub ma_fast: Option<f64>,
    pub ma_slow: Option<f64>,
    pub trend: Trend,
    pub confidence_percent: f64,
    pub chart: ChartData,
}

/// Output of the long-range overlay path: moving averages only, no
/// inference involved.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayReport {
    pub ticker: String,
    pub currency: String,
    pub rate_source: RateSource,
    pub labels: Vec<String>,
    pub ma_fast: Vec<Option<f64>>,
    pub ma_slow: Vec<Option<f64>>,
}
