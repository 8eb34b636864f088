use crate::application::ml::sequence_model::{LoadedModel, ModelLoader};
use crate::domain::errors::ModelLoadError;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Process-lifetime owner of the loaded model and scaler.
///
/// Single-writer-at-init, many-reader: the first caller triggers exactly
/// one load while concurrent callers wait on the same cell; afterwards
/// every request reuses the immutable `LoadedModel`, so reads need no
/// locking. A failed load is not cached — the next access retries, and
/// until a load succeeds the service serves no predictions.
pub struct ModelRuntime {
    loader: Box<dyn ModelLoader>,
    cell: OnceCell<Arc<LoadedModel>>,
}

impl ModelRuntime {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    /// Returns the loaded model, loading it on first use. Hosts that
    /// prefer to fail fast call this once at startup and treat an error
    /// as fatal.
    pub async fn ensure_loaded(&self) -> Result<Arc<LoadedModel>, ModelLoadError> {
        let loaded = self
            .cell
            .get_or_try_init(|| async {
                match self.loader.load() {
                    Ok(loaded) => {
                        info!(
                            model = loaded.model.name(),
                            version = loaded.model.version(),
                            scaler_version = loaded.scaler.version(),
                            "model artifacts loaded"
                        );
                        Ok(Arc::new(loaded))
                    }
                    Err(e) => {
                        error!(error = %e, "model load failed");
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(loaded))
    }
}
