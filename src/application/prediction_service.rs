//! End-to-end orchestration: "predict next close for ticker T".
//!
//! Validation happens before any I/O, the model is resolved through the
//! single-flight runtime, and one exchange rate is applied uniformly to
//! every price in the response.

use crate::application::confidence;
use crate::application::currency::{CurrencyConverter, ResolvedRate};
use crate::application::indicators::{IndicatorEngine, IndicatorSeries, moving_average};
use crate::application::ml::runtime::ModelRuntime;
use crate::application::windowing::FeatureWindower;
use crate::config::PredictorConfig;
use crate::domain::errors::{MarketDataError, PredictionError};
use crate::domain::ports::{ExchangeRateService, MarketDataService};
use crate::domain::types::{ChartData, OverlayReport, PredictionReport, PriceBar};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_TICKER_LEN: usize = 12;

/// Rejects anything that is not a plausible exchange symbol before a
/// single network call is made. Alphanumerics plus `. - ^ =` cover the
/// usual suspects (`BRK.B`, `^GSPC`, `INR=X`).
fn validate_ticker(raw: &str) -> Result<String, PredictionError> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_TICKER_LEN
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        && trimmed.chars().any(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(PredictionError::InvalidTicker {
            ticker: raw.to_string(),
        })
    }
}

pub struct PredictionService {
    config: PredictorConfig,
    market_data: Arc<dyn MarketDataService>,
    runtime: Arc<ModelRuntime>,
    converter: CurrencyConverter,
    engine: IndicatorEngine,
    windower: FeatureWindower,
}

impl PredictionService {
    pub fn new(
        config: PredictorConfig,
        market_data: Arc<dyn MarketDataService>,
        rates: Arc<dyn ExchangeRateService>,
        runtime: Arc<ModelRuntime>,
    ) -> Self {
        let engine = IndicatorEngine::new(&config);
        let windower = FeatureWindower::new(config.window, config.features.clone());
        let converter = CurrencyConverter::new(rates, config.fallback_rate);
        Self {
            config,
            market_data,
            runtime,
            converter,
            engine,
            windower,
        }
    }

    /// Predicts the next session's close for `ticker` and assembles the
    /// chart-ready response.
    pub async fn predict_next_close(
        &self,
        ticker: &str,
    ) -> Result<PredictionReport, PredictionError> {
        let ticker = validate_ticker(ticker)?;
        let loaded = self.runtime.ensure_loaded().await?;

        let bars = self
            .fetch_bars(&ticker, self.config.history_lookback_days)
            .await?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let Some(&last_close) = closes.last() else {
            return Err(PredictionError::TickerNotFound { ticker });
        };

        let indicators = self.engine.compute(&closes);
        let columns: Vec<Vec<Option<f64>>> = self
            .windower
            .features()
            .iter()
            .map(|f| indicators.feature_column(*f, &closes))
            .collect();
        let window = self.windower.build(&columns, &loaded.scaler)?;

        let scaled = loaded
            .model
            .predict(window.view())
            .map_err(|e| PredictionError::Inference {
                reason: e.to_string(),
            })?;
        let predicted = self.windower.inverse_close(&loaded.scaler, scaled);
        debug!(ticker = %ticker, last_close, predicted, "inference complete");

        let trend = confidence::trend(last_close, predicted);
        let confidence_percent = confidence::confidence(last_close, predicted);

        let rate = self
            .converter
            .resolve_rate(&self.config.quote_currency)
            .await;
        let chart = self.chart_tail(&bars, &indicators, &rate);

        info!(
            ticker = %ticker,
            %trend,
            confidence_percent,
            rate_source = ?rate.source,
            "prediction assembled"
        );

        Ok(PredictionReport {
            ticker,
            currency: self.config.quote_currency.clone(),
            rate_source: rate.source,
            last_close: rate.apply(last_close),
            predicted_close: rate.apply(predicted),
            ma_fast: rate.apply_opt(indicators.ma_fast.last().copied().flatten()),
            ma_slow: rate.apply_opt(indicators.ma_slow.last().copied().flatten()),
            trend,
            confidence_percent,
            chart,
        })
    }

    /// Long-range moving-average overlay. Runs only the indicator
    /// engine — no model, no windowing — so it stays cheap enough for
    /// decade-scale charts.
    pub async fn historical_overlay(&self, ticker: &str) -> Result<OverlayReport, PredictionError> {
        let ticker = validate_ticker(ticker)?;
        let bars = self
            .fetch_bars(&ticker, self.config.overlay_lookback_days)
            .await?;
        if bars.is_empty() {
            return Err(PredictionError::TickerNotFound { ticker });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ma_fast = moving_average(&closes, self.config.ma_fast_window);
        let ma_slow = moving_average(&closes, self.config.ma_slow_window);

        let rate = self
            .converter
            .resolve_rate(&self.config.quote_currency)
            .await;

        Ok(OverlayReport {
            ticker,
            currency: self.config.quote_currency.clone(),
            rate_source: rate.source,
            labels: bars
                .iter()
                .map(|b| b.date.format("%Y-%m-%d").to_string())
                .collect(),
            ma_fast: ma_fast.iter().map(|v| rate.apply_opt(*v)).collect(),
            ma_slow: ma_slow.iter().map(|v| rate.apply_opt(*v)).collect(),
        })
    }

    async fn fetch_bars(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, PredictionError> {
        let bars = self
            .market_data
            .fetch_history(ticker, lookback_days)
            .await
            .map_err(|e| match e {
                MarketDataError::NotFound { .. } => PredictionError::TickerNotFound {
                    ticker: ticker.to_string(),
                },
                other => PredictionError::MarketData(other),
            })?;
        if bars.is_empty() {
            return Err(PredictionError::TickerNotFound {
                ticker: ticker.to_string(),
            });
        }
        Ok(bars)
    }

    fn chart_tail(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
        rate: &ResolvedRate,
    ) -> ChartData {
        let start = bars.len().saturating_sub(self.config.chart_bars);
        ChartData {
            labels: bars[start..]
                .iter()
                .map(|b| b.date.format("%Y-%m-%d").to_string())
                .collect(),
            close: bars[start..].iter().map(|b| rate.apply(b.close)).collect(),
            ma_fast: indicators.ma_fast[start..]
                .iter()
                .map(|v| rate.apply_opt(*v))
                .collect(),
            ma_slow: indicators.ma_slow[start..]
                .iter()
                .map(|v| rate.apply_opt(*v))
                .collect(),
        }
    }
}
