use crate::domain::errors::MarketDataError;
use crate::domain::types::PriceBar;
use anyhow::Result;
use async_trait::async_trait;

/// Historical market-data collaborator.
///
/// Implementations must return bars in ascending date order with no
/// duplicate dates, and `MarketDataError::NotFound` for unknown or
/// delisted symbols. Requests carry their own timeout; no shared lock
/// may be held while a fetch is in flight.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    async fn fetch_history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, MarketDataError>;
}

/// Live exchange-rate collaborator. Any failure here is recovered by the
/// currency converter's fallback rate, so implementations just report
/// what went wrong.
#[async_trait]
pub trait ExchangeRateService: Send + Sync {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<f64>;
}
