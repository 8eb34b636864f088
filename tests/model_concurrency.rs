//! Single-flight model lifecycle under concurrent first use.

use chrono::NaiveDate;
use std::sync::Arc;
use stockcast::application::ml::runtime::ModelRuntime;
use stockcast::application::prediction_service::PredictionService;
use stockcast::config::PredictorConfig;
use stockcast::domain::errors::{ModelLoadError, PredictionError};
use stockcast::infrastructure::mock::{
    FailingModelLoader, MockExchangeRateService, MockMarketDataService, StaticModelLoader,
    close_scaler, synthetic_series,
};

const TICKER: &str = "TCS";

fn bars() -> Vec<stockcast::domain::types::PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64 * 0.16).collect();
    synthetic_series(start, &closes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_loads_exactly_once() {
    let loader = StaticModelLoader::new(0.625, close_scaler(0.0, 200.0));
    let load_counter = loader.load_counter();
    let runtime = Arc::new(ModelRuntime::new(Box::new(loader)));
    let market = Arc::new(MockMarketDataService::with_series(TICKER, bars()));
    let rates = Arc::new(MockExchangeRateService::with_rate(80.0));
    let service = Arc::new(PredictionService::new(
        PredictorConfig::default(),
        market,
        rates,
        runtime,
    ));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.predict_next_close(TICKER).await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!((70.0..=90.0).contains(&report.confidence_percent));
    }
    assert_eq!(load_counter.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_access_reuses_the_loaded_model() {
    let loader = StaticModelLoader::new(0.5, close_scaler(0.0, 200.0));
    let load_counter = loader.load_counter();
    let runtime = ModelRuntime::new(Box::new(loader));

    let first = runtime.ensure_loaded().await.unwrap();
    let second = runtime.ensure_loaded().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(load_counter.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_load_blocks_predictions() {
    let runtime = Arc::new(ModelRuntime::new(Box::new(FailingModelLoader)));
    let market = Arc::new(MockMarketDataService::with_series(TICKER, bars()));
    let rates = Arc::new(MockExchangeRateService::with_rate(80.0));
    let service = PredictionService::new(PredictorConfig::default(), market, rates, runtime);

    let err = service.predict_next_close(TICKER).await.unwrap_err();
    assert!(matches!(
        err,
        PredictionError::ModelLoad(ModelLoadError::ArtifactMissing { .. })
    ));
}
