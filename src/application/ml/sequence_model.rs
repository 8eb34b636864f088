use crate::application::windowing::Scaler;
use crate::domain::errors::ModelLoadError;
use ndarray::ArrayView2;

/// Interface for trained sequence models.
///
/// `predict` is a pure function of the loaded weights and the input
/// window: deterministic across calls, no internal randomness at
/// inference time, and no mutation of shared weight state.
pub trait SequenceModel: Send + Sync {
    /// Runs one inference over a scaled `(W, F)` window and returns the
    /// scaled prediction for the target feature.
    fn predict(&self, window: ArrayView2<'_, f32>) -> anyhow::Result<f64>;

    /// Model name/type for logs.
    fn name(&self) -> &str;

    /// Artifact version identifier.
    fn version(&self) -> &str;
}

/// Model plus its fitted scaler, loaded and validated together. Both are
/// immutable after load and shared read-only across requests.
pub struct LoadedModel {
    pub model: Box<dyn SequenceModel>,
    pub scaler: Scaler,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.name())
            .field("version", &self.model.version())
            .finish()
    }
}

/// Deserializes the model/scaler artifacts and verifies their declared
/// input shape and feature order against the windower configuration.
/// Every failure mode is an eager `ModelLoadError` — nothing is deferred
/// to the first inference.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<LoadedModel, ModelLoadError>;
}
