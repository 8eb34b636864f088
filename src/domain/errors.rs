use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the market-data collaborator.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("no data for symbol {symbol}")]
    NotFound { symbol: String },

    #[error("market data request failed: {reason}")]
    Upstream { reason: String },
}

/// Errors raised while loading the model/scaler artifacts. Fatal: the
/// service refuses to serve predictions until the artifacts are fixed.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model artifact missing: {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("model artifact unreadable at {path}: {reason}")]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error(
        "model input shape mismatch: artifact declares {artifact_window}x{artifact_features}, expected {expected_window}x{expected_features}"
    )]
    ShapeMismatch {
        artifact_window: usize,
        artifact_features: usize,
        expected_window: usize,
        expected_features: usize,
    },

    #[error(
        "feature order mismatch at position {position}: artifact has '{artifact}', configuration has '{configured}'"
    )]
    FeatureOrderMismatch {
        position: usize,
        artifact: String,
        configured: String,
    },
}

/// Error taxonomy of the prediction pipeline.
///
/// `InvalidTicker` is rejected before any I/O. `TickerNotFound` maps to a
/// 404-equivalent at the HTTP boundary, `InsufficientHistory` to an
/// unprocessable-entity response. Exchange-rate failures never appear
/// here: they are absorbed by the currency converter's fallback.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid ticker symbol: '{ticker}'")]
    InvalidTicker { ticker: String },

    #[error("no historical data for ticker {ticker}")]
    TickerNotFound { ticker: String },

    #[error("insufficient history: need {required} valid rows, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("model unavailable: {0}")]
    ModelLoad(#[from] ModelLoadError),

    #[error("inference failed: {reason}")]
    Inference { reason: String },

    #[error(transparent)]
    MarketData(MarketDataError),
}
