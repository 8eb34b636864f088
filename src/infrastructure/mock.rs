//! In-memory collaborators for tests and offline runs.
//!
//! The market-data and exchange-rate mocks count their calls so tests
//! can assert that invalid input short-circuits before any I/O, and the
//! model stubs let the pipeline run without an ONNX artifact on disk.

use crate::application::ml::sequence_model::{LoadedModel, ModelLoader, SequenceModel};
use crate::application::windowing::{FeatureScale, Scaler};
use crate::domain::errors::{MarketDataError, ModelLoadError};
use crate::domain::ports::{ExchangeRateService, MarketDataService};
use crate::domain::types::PriceBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use ndarray::ArrayView2;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Consecutive daily bars with the given closes, for synthetic
/// histories in tests.
pub fn synthetic_series(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + Days::new(i as u64),
            open: close * 0.995,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0,
        })
        .collect()
}

/// Single-feature min-max scaler over the close price.
pub fn close_scaler(min: f64, max: f64) -> Scaler {
    Scaler::new(
        "mock",
        vec![FeatureScale {
            name: "close".to_string(),
            min,
            max,
        }],
    )
    .expect("mock scaler range is non-empty")
}

#[derive(Default)]
pub struct MockMarketDataService {
    series: HashMap<String, Vec<PriceBar>>,
    calls: AtomicUsize,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(ticker: &str, bars: Vec<PriceBar>) -> Self {
        let mut service = Self::new();
        service.insert(ticker, bars);
        service
    }

    pub fn insert(&mut self, ticker: &str, bars: Vec<PriceBar>) {
        self.series.insert(ticker.to_string(), bars);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn fetch_history(
        &self,
        ticker: &str,
        _lookback_days: u32,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound {
                symbol: ticker.to_string(),
            })
    }
}

pub struct MockExchangeRateService {
    rate: Option<f64>,
    calls: AtomicUsize,
}

impl MockExchangeRateService {
    pub fn with_rate(rate: f64) -> Self {
        Self {
            rate: Some(rate),
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulates an unreachable rate source; every fetch errors.
    pub fn failing() -> Self {
        Self {
            rate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeRateService for MockExchangeRateService {
    async fn fetch_rate(&self, _base: &str, _quote: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rate
            .ok_or_else(|| anyhow::anyhow!("simulated exchange-rate outage"))
    }
}

/// Deterministic stand-in for the ONNX model: always returns the same
/// scaled value regardless of the input window.
pub struct FixedSequenceModel {
    pub output: f64,
}

impl SequenceModel for FixedSequenceModel {
    fn predict(&self, _window: ArrayView2<'_, f32>) -> Result<f64> {
        Ok(self.output)
    }

    fn name(&self) -> &str {
        "fixed-output stub"
    }

    fn version(&self) -> &str {
        "test"
    }
}

/// Loader that serves a `FixedSequenceModel` and counts how many times
/// it actually ran, for single-flight assertions.
pub struct StaticModelLoader {
    output: f64,
    scaler: Scaler,
    loads: Arc<AtomicUsize>,
}

impl StaticModelLoader {
    pub fn new(output: f64, scaler: Scaler) -> Self {
        Self {
            output,
            scaler,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the load counter, valid after the loader is moved into
    /// a runtime.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl ModelLoader for StaticModelLoader {
    fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(LoadedModel {
            model: Box::new(FixedSequenceModel {
                output: self.output,
            }),
            scaler: self.scaler.clone(),
        })
    }
}

/// Loader whose artifact is always missing; every load fails.
pub struct FailingModelLoader;

impl ModelLoader for FailingModelLoader {
    fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        Err(ModelLoadError::ArtifactMissing {
            path: PathBuf::from("missing/next_close.onnx"),
        })
    }
}
