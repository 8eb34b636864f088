//! Yahoo Finance v8 chart API client.
//!
//! Backs both ports: daily OHLCV history and the USD→quote exchange
//! rate (Yahoo quotes currencies as `INR=X` style synthetic tickers).
//! Requests carry a strict timeout and are never retried here — history
//! failures surface to the caller, rate failures are absorbed by the
//! currency converter's fallback.

use crate::domain::errors::MarketDataError;
use crate::domain::ports::{ExchangeRateService, MarketDataService};
use crate::domain::types::PriceBar;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteBlock>,
}

// Yahoo emits per-cell nulls for halted or missing sessions.
#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<ChartResult, MarketDataError> {
        let period2 = Utc::now().timestamp();
        let period1 = period2 - i64::from(lookback_days) * 86_400;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", "1d".to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::Upstream {
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(MarketDataError::Upstream {
                reason: format!("chart request returned status {}", response.status()),
            });
        }

        let body: ChartResponse = response.json().await.map_err(|e| MarketDataError::Upstream {
            reason: format!("malformed chart payload: {}", e),
        })?;

        if let Some(err) = body.chart.error {
            debug!(symbol, code = %err.code, description = ?err.description, "chart error");
            return Err(MarketDataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        body.chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
            .ok_or_else(|| MarketDataError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

fn bars_from_chart(result: ChartResult) -> Vec<PriceBar> {
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let cell = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            cell(opens.as_slice(), i),
            cell(highs.as_slice(), i),
            cell(lows.as_slice(), i),
            cell(closes.as_slice(), i),
        ) else {
            continue;
        };
        // The port contract promises ascending unique dates; drop
        // anything out of order (intraday stubs on the current session).
        if bars.last().is_some_and(|prev: &PriceBar| prev.date >= date) {
            continue;
        }
        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: cell(volumes.as_slice(), i).unwrap_or(0.0),
        });
    }
    bars
}

#[async_trait]
impl MarketDataService for YahooFinanceClient {
    async fn fetch_history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        let result = self.fetch_chart(ticker, lookback_days).await?;
        let bars = bars_from_chart(result);
        debug!(ticker, bars = bars.len(), "history fetched");
        Ok(bars)
    }
}

#[async_trait]
impl ExchangeRateService for YahooFinanceClient {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<f64> {
        // Yahoo's USD crosses drop the base: USD→INR is just "INR=X".
        let symbol = if base.eq_ignore_ascii_case("USD") {
            format!("{}=X", quote)
        } else {
            format!("{}{}=X", base, quote)
        };
        let result = self
            .fetch_chart(&symbol, 5)
            .await
            .with_context(|| format!("Failed to fetch exchange rate {}", symbol))?;
        let bars = bars_from_chart(result);
        bars.last()
            .map(|bar| bar.close)
            .with_context(|| format!("No rate data in chart payload for {}", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_payload_maps_to_bars() {
        let raw = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, null, 102.0],
                            "high": [101.0, 102.5, 103.0],
                            "low": [99.0, 100.5, 101.0],
                            "close": [100.5, 101.5, 102.5],
                            "volume": [1000000, 1100000, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(raw).unwrap();
        let bars = bars_from_chart(parsed.chart.result.unwrap().remove(0));
        // Second row has a null open and is dropped, not zero-filled.
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].close, 102.5);
        assert_eq!(bars[1].volume, 0.0);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn chart_error_parses() {
        let raw = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.chart.error.unwrap().code, "Not Found");
    }
}
