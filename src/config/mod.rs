//! Configuration for the prediction core.
//!
//! Loaded from environment variables with documented defaults, in the
//! same shape the rest of the codebase expects: indicator windows, the
//! model window, the configured feature columns, artifact paths, fetch
//! lookbacks and the currency settings.

use crate::domain::feature_registry::Feature;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    // Artifacts
    pub model_path: PathBuf,
    pub manifest_path: PathBuf,
    pub scaler_path: PathBuf,

    // Model input shape
    pub window: usize,
    pub features: Vec<Feature>,

    // Indicators
    pub ma_fast_window: usize,
    pub ma_slow_window: usize,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_window: usize,
    pub bb_k: f64,

    // Data fetch
    pub history_lookback_days: u32,
    pub overlay_lookback_days: u32,
    pub chart_bars: usize,
    pub http_timeout_secs: u64,

    // Currency
    pub quote_currency: String,
    pub fallback_rate: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("artifacts/next_close.onnx"),
            manifest_path: PathBuf::from("artifacts/next_close.json"),
            scaler_path: PathBuf::from("artifacts/scaler.json"),
            window: 60,
            features: vec![Feature::Close],
            ma_fast_window: 100,
            ma_slow_window: 200,
            rsi_window: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_window: 20,
            bb_k: 2.0,
            history_lookback_days: 365,
            overlay_lookback_days: 3650,
            chart_bars: 300,
            http_timeout_secs: 10,
            quote_currency: "INR".to_string(),
            fallback_rate: 83.0,
        }
    }
}

impl PredictorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let features = match env::var("STOCKCAST_FEATURES") {
            Ok(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Feature::from_str)
                .collect::<Result<Vec<_>>>()
                .context("Failed to parse STOCKCAST_FEATURES")?,
            Err(_) => defaults.features.clone(),
        };

        let config = Self {
            model_path: env_path("STOCKCAST_MODEL_PATH", defaults.model_path),
            manifest_path: env_path("STOCKCAST_MANIFEST_PATH", defaults.manifest_path),
            scaler_path: env_path("STOCKCAST_SCALER_PATH", defaults.scaler_path),
            window: env_parse("STOCKCAST_WINDOW", defaults.window)?,
            features,
            ma_fast_window: env_parse("STOCKCAST_MA_FAST", defaults.ma_fast_window)?,
            ma_slow_window: env_parse("STOCKCAST_MA_SLOW", defaults.ma_slow_window)?,
            rsi_window: env_parse("STOCKCAST_RSI_WINDOW", defaults.rsi_window)?,
            macd_fast: env_parse("STOCKCAST_MACD_FAST", defaults.macd_fast)?,
            macd_slow: env_parse("STOCKCAST_MACD_SLOW", defaults.macd_slow)?,
            macd_signal: env_parse("STOCKCAST_MACD_SIGNAL", defaults.macd_signal)?,
            bb_window: env_parse("STOCKCAST_BB_WINDOW", defaults.bb_window)?,
            bb_k: env_parse("STOCKCAST_BB_K", defaults.bb_k)?,
            history_lookback_days: env_parse(
                "STOCKCAST_HISTORY_LOOKBACK_DAYS",
                defaults.history_lookback_days,
            )?,
            overlay_lookback_days: env_parse(
                "STOCKCAST_OVERLAY_LOOKBACK_DAYS",
                defaults.overlay_lookback_days,
            )?,
            chart_bars: env_parse("STOCKCAST_CHART_BARS", defaults.chart_bars)?,
            http_timeout_secs: env_parse("STOCKCAST_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            quote_currency: env::var("STOCKCAST_QUOTE_CURRENCY")
                .unwrap_or(defaults.quote_currency),
            fallback_rate: env_parse("STOCKCAST_FALLBACK_RATE", defaults.fallback_rate)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the pipeline cannot run with. Indicator
    /// constructors assume non-zero windows, and the windower needs the
    /// close feature to inverse-scale the model output.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.window > 0, "model window must be positive");
        anyhow::ensure!(!self.features.is_empty(), "feature list must not be empty");
        anyhow::ensure!(
            self.features.contains(&Feature::Close),
            "feature list must include 'close' (the predicted feature)"
        );
        anyhow::ensure!(
            self.ma_fast_window > 0 && self.ma_slow_window > 0,
            "moving-average windows must be positive"
        );
        anyhow::ensure!(
            self.ma_fast_window < self.ma_slow_window,
            "fast MA window must be shorter than slow MA window"
        );
        anyhow::ensure!(self.rsi_window > 0, "RSI window must be positive");
        anyhow::ensure!(
            self.macd_fast > 0 && self.macd_fast < self.macd_slow,
            "MACD fast period must be positive and shorter than slow"
        );
        anyhow::ensure!(self.macd_signal > 0, "MACD signal period must be positive");
        anyhow::ensure!(self.bb_window > 0, "Bollinger window must be positive");
        anyhow::ensure!(self.bb_k > 0.0, "Bollinger multiplier must be positive");
        anyhow::ensure!(self.chart_bars > 0, "chart span must be positive");
        anyhow::ensure!(
            self.fallback_rate > 0.0,
            "fallback exchange rate must be positive"
        );
        Ok(())
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}
