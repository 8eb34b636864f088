//! USD → display-currency conversion with a hardcoded fallback.
//!
//! A rate fetch can fail for all the usual reasons (network, timeout,
//! malformed payload). None of them may fail a prediction request: the
//! converter degrades to the configured fallback rate and marks the
//! result, so the caller always gets a value and the degradation stays
//! visible in logs.

use crate::domain::ports::ExchangeRateService;
use crate::domain::types::RateSource;
use std::sync::Arc;
use tracing::warn;

/// A resolved rate plus where it came from. One of these is resolved per
/// request and applied to every price-denominated output, so chart
/// series stay internally consistent in a single currency.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRate {
    pub rate: f64,
    pub source: RateSource,
}

impl ResolvedRate {
    pub fn apply(&self, amount_usd: f64) -> f64 {
        amount_usd * self.rate
    }

    pub fn apply_opt(&self, amount_usd: Option<f64>) -> Option<f64> {
        amount_usd.map(|v| self.apply(v))
    }
}

pub struct CurrencyConverter {
    rates: Arc<dyn ExchangeRateService>,
    fallback_rate: f64,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn ExchangeRateService>, fallback_rate: f64) -> Self {
        Self {
            rates,
            fallback_rate,
        }
    }

    /// Fetches the live USD→`quote` rate, falling back on any failure or
    /// nonsensical value. Never errors, never retries.
    pub async fn resolve_rate(&self, quote: &str) -> ResolvedRate {
        match self.rates.fetch_rate("USD", quote).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => ResolvedRate {
                rate,
                source: RateSource::Live,
            },
            Ok(rate) => {
                warn!(
                    quote,
                    rate,
                    fallback = self.fallback_rate,
                    "exchange rate out of range, using fallback"
                );
                self.fallback()
            }
            Err(e) => {
                warn!(
                    quote,
                    error = %e,
                    fallback = self.fallback_rate,
                    "exchange rate fetch failed, using fallback"
                );
                self.fallback()
            }
        }
    }

    /// Converts a single USD amount into `quote` units.
    pub async fn convert(&self, amount_usd: f64, quote: &str) -> (f64, ResolvedRate) {
        let rate = self.resolve_rate(quote).await;
        (rate.apply(amount_usd), rate)
    }

    fn fallback(&self) -> ResolvedRate {
        ResolvedRate {
            rate: self.fallback_rate,
            source: RateSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockExchangeRateService;

    #[tokio::test]
    async fn fetch_failure_falls_back() {
        let converter = CurrencyConverter::new(Arc::new(MockExchangeRateService::failing()), 83.0);
        let (converted, rate) = converter.convert(100.0, "INR").await;
        assert_eq!(converted, 8300.0);
        assert_eq!(rate.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn live_rate_is_used_when_available() {
        let converter =
            CurrencyConverter::new(Arc::new(MockExchangeRateService::with_rate(82.5)), 83.0);
        let (converted, rate) = converter.convert(2.0, "INR").await;
        assert_eq!(converted, 165.0);
        assert_eq!(rate.source, RateSource::Live);
    }

    #[tokio::test]
    async fn nonsensical_live_rate_falls_back() {
        let converter =
            CurrencyConverter::new(Arc::new(MockExchangeRateService::with_rate(-1.0)), 83.0);
        let rate = converter.resolve_rate("INR").await;
        assert_eq!(rate.source, RateSource::Fallback);
        assert_eq!(rate.rate, 83.0);
    }
}
