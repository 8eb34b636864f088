//! End-to-end prediction pipeline tests over mock collaborators.

use chrono::NaiveDate;
use std::sync::Arc;
use stockcast::application::ml::runtime::ModelRuntime;
use stockcast::application::prediction_service::PredictionService;
use stockcast::config::PredictorConfig;
use stockcast::domain::errors::PredictionError;
use stockcast::domain::types::{PriceBar, RateSource, Trend};
use stockcast::infrastructure::mock::{
    FailingModelLoader, MockExchangeRateService, MockMarketDataService, StaticModelLoader,
    close_scaler, synthetic_series,
};

const TICKER: &str = "TCS";
const FALLBACK_RATE: f64 = 83.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn rising_closes(n: usize, from: f64, to: f64) -> Vec<f64> {
    (0..n)
        .map(|i| from + (to - from) * i as f64 / (n - 1) as f64)
        .collect()
}

struct Fixture {
    service: PredictionService,
    market: Arc<MockMarketDataService>,
    rates: Arc<MockExchangeRateService>,
}

/// Service over mock collaborators. The stub model always emits
/// `model_output` in scaled space; the scaler maps close prices over
/// [0, 200], so an output of 0.625 inverse-scales to 125.0.
fn fixture(
    bars: Vec<PriceBar>,
    rates: MockExchangeRateService,
    model_output: f64,
) -> Fixture {
    let market = Arc::new(MockMarketDataService::with_series(TICKER, bars));
    let rates = Arc::new(rates);
    let loader = StaticModelLoader::new(model_output, close_scaler(0.0, 200.0));
    let runtime = Arc::new(ModelRuntime::new(Box::new(loader)));
    let service = PredictionService::new(
        PredictorConfig::default(),
        market.clone(),
        rates.clone(),
        runtime,
    );
    Fixture {
        service,
        market,
        rates,
    }
}

#[tokio::test]
async fn rising_series_predicts_up_within_confidence_band() {
    init_tracing();
    let closes = rising_closes(120, 100.0, 119.0);
    let fx = fixture(
        synthetic_series(start_date(), &closes),
        MockExchangeRateService::failing(),
        0.625,
    );

    let report = fx.service.predict_next_close(TICKER).await.unwrap();

    assert_eq!(report.ticker, TICKER);
    assert_eq!(report.trend, Trend::Up);
    assert!((70.0..=90.0).contains(&report.confidence_percent));

    // Rate fetch failed, so everything is converted at the fallback.
    assert_eq!(report.rate_source, RateSource::Fallback);
    assert!((report.last_close - 119.0 * FALLBACK_RATE).abs() < 1e-9);
    assert!((report.predicted_close - 125.0 * FALLBACK_RATE).abs() < 1e-9);

    // 120 bars fit inside the 300-bar chart span.
    assert_eq!(report.chart.labels.len(), 120);
    assert_eq!(report.chart.close.len(), 120);
    assert_eq!(report.chart.ma_fast.len(), 120);

    // MA(100) warms up after bar 100; MA(200) never does on 120 bars.
    assert_eq!(report.chart.ma_fast.iter().flatten().count(), 21);
    assert!(report.chart.ma_slow.iter().all(Option::is_none));
    assert!(report.ma_fast.is_some());
    assert!(report.ma_slow.is_none());
}

#[tokio::test]
async fn live_rate_converts_all_prices() {
    let closes = rising_closes(120, 100.0, 119.0);
    let fx = fixture(
        synthetic_series(start_date(), &closes),
        MockExchangeRateService::with_rate(80.0),
        0.625,
    );

    let report = fx.service.predict_next_close(TICKER).await.unwrap();
    assert_eq!(report.rate_source, RateSource::Live);
    assert!((report.last_close - 119.0 * 80.0).abs() < 1e-9);
    assert!((report.predicted_close - 125.0 * 80.0).abs() < 1e-9);
    let last_chart_close = *report.chart.close.last().unwrap();
    assert!((last_chart_close - 119.0 * 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn prediction_is_deterministic_across_calls() {
    let closes = rising_closes(120, 100.0, 119.0);
    let fx = fixture(
        synthetic_series(start_date(), &closes),
        MockExchangeRateService::with_rate(80.0),
        0.625,
    );

    let first = fx.service.predict_next_close(TICKER).await.unwrap();
    let second = fx.service.predict_next_close(TICKER).await.unwrap();
    assert_eq!(first.predicted_close, second.predicted_close);
    assert_eq!(first.confidence_percent, second.confidence_percent);
    assert_eq!(first.trend, second.trend);
}

#[tokio::test]
async fn invalid_ticker_fails_before_any_network_call() {
    let fx = fixture(
        synthetic_series(start_date(), &rising_closes(120, 100.0, 119.0)),
        MockExchangeRateService::with_rate(80.0),
        0.625,
    );

    let err = fx.service.predict_next_close("???").await.unwrap_err();
    assert!(matches!(err, PredictionError::InvalidTicker { .. }));
    assert_eq!(fx.market.call_count(), 0);
    assert_eq!(fx.rates.call_count(), 0);
}

#[tokio::test]
async fn unknown_ticker_maps_to_not_found() {
    let fx = fixture(
        synthetic_series(start_date(), &rising_closes(120, 100.0, 119.0)),
        MockExchangeRateService::with_rate(80.0),
        0.625,
    );

    let err = fx.service.predict_next_close("MSFT").await.unwrap_err();
    match err {
        PredictionError::TickerNotFound { ticker } => assert_eq!(ticker, "MSFT"),
        other => panic!("expected TickerNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn short_history_is_insufficient_not_padded() {
    let fx = fixture(
        synthetic_series(start_date(), &rising_closes(50, 100.0, 110.0)),
        MockExchangeRateService::with_rate(80.0),
        0.625,
    );

    let err = fx.service.predict_next_close(TICKER).await.unwrap_err();
    match err {
        PredictionError::InsufficientHistory {
            required,
            available,
        } => {
            assert_eq!(required, 60);
            assert_eq!(available, 50);
        }
        other => panic!("expected InsufficientHistory, got {:?}", other),
    }
}

#[tokio::test]
async fn overlay_runs_without_a_model() {
    // A broken model loader proves the overlay path never touches
    // inference.
    let closes = rising_closes(250, 90.0, 140.0);
    let market = Arc::new(MockMarketDataService::with_series(
        TICKER,
        synthetic_series(start_date(), &closes),
    ));
    let rates = Arc::new(MockExchangeRateService::failing());
    let runtime = Arc::new(ModelRuntime::new(Box::new(FailingModelLoader)));
    let service = PredictionService::new(
        PredictorConfig::default(),
        market.clone(),
        rates.clone(),
        runtime,
    );

    let overlay = service.historical_overlay(TICKER).await.unwrap();
    assert_eq!(overlay.labels.len(), 250);
    assert_eq!(overlay.ma_fast.len(), 250);
    assert_eq!(overlay.ma_slow.iter().flatten().count(), 51);
    assert_eq!(overlay.rate_source, RateSource::Fallback);

    // The prediction path on the same service does fail on the model.
    let err = service.predict_next_close(TICKER).await.unwrap_err();
    assert!(matches!(err, PredictionError::ModelLoad(_)));
}
