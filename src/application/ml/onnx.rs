//! ONNX Runtime backing for `SequenceModel`.
//!
//! The artifact is a trio of files: the ONNX weights, a JSON manifest
//! declaring the trained input shape and feature order, and the fitted
//! scaler. The loader cross-checks all three against the windower
//! configuration so a stale or misordered artifact fails at load time,
//! not at the first inference.

use crate::application::ml::sequence_model::{LoadedModel, ModelLoader, SequenceModel};
use crate::application::windowing::Scaler;
use crate::config::PredictorConfig;
use crate::domain::errors::ModelLoadError;
use crate::domain::feature_registry::Feature;
use anyhow::anyhow;
use ndarray::ArrayView2;
use ort::session::Session;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sidecar metadata written by the training pipeline next to the
/// weights. `features` is the training-time column order.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub window: usize,
    pub features: Vec<String>,
}

impl ModelManifest {
    pub fn from_path(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ModelLoadError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ModelLoadError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

pub struct OnnxSequenceModel {
    // ort sessions need exclusive access to run in this binding; the
    // lock is scoped to a single inference and never spans I/O.
    session: Mutex<Session>,
    version: String,
}

impl SequenceModel for OnnxSequenceModel {
    fn predict(&self, window: ArrayView2<'_, f32>) -> anyhow::Result<f64> {
        let (rows, cols) = window.dim();
        let flat: Vec<f32> = window.iter().copied().collect();
        let shape = vec![1, rows, cols];

        let input_value = ort::value::Value::from_array((shape.as_slice(), flat))
            .map_err(|e| anyhow!("input tensor creation failed: {}", e))?;
        let inputs = ort::inputs![input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("model session lock poisoned"))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| anyhow!("inference run failed: {}", e))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("output tensor extraction failed: {}", e))?;
        data.1
            .iter()
            .next()
            .map(|&v| v as f64)
            .ok_or_else(|| anyhow!("model output tensor is empty"))
    }

    fn name(&self) -> &str {
        "ONNX Runtime (LSTM)"
    }

    fn version(&self) -> &str {
        &self.version
    }
}

pub struct OnnxModelLoader {
    model_path: PathBuf,
    manifest_path: PathBuf,
    scaler_path: PathBuf,
    expected_window: usize,
    expected_features: Vec<Feature>,
}

impl OnnxModelLoader {
    pub fn from_config(config: &PredictorConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            manifest_path: config.manifest_path.clone(),
            scaler_path: config.scaler_path.clone(),
            expected_window: config.window,
            expected_features: config.features.clone(),
        }
    }

    fn check_feature_order<'a, I>(&self, names: I) -> Result<(), ModelLoadError>
    where
        I: Iterator<Item = &'a str>,
    {
        for (position, (artifact, configured)) in
            names.zip(self.expected_features.iter()).enumerate()
        {
            if artifact != configured.name() {
                return Err(ModelLoadError::FeatureOrderMismatch {
                    position,
                    artifact: artifact.to_string(),
                    configured: configured.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        let manifest = ModelManifest::from_path(&self.manifest_path)?;

        if manifest.window != self.expected_window
            || manifest.features.len() != self.expected_features.len()
        {
            return Err(ModelLoadError::ShapeMismatch {
                artifact_window: manifest.window,
                artifact_features: manifest.features.len(),
                expected_window: self.expected_window,
                expected_features: self.expected_features.len(),
            });
        }
        self.check_feature_order(manifest.features.iter().map(String::as_str))?;

        let scaler = Scaler::from_path(&self.scaler_path)?;
        if scaler.len() != self.expected_features.len() {
            return Err(ModelLoadError::ShapeMismatch {
                artifact_window: manifest.window,
                artifact_features: scaler.len(),
                expected_window: self.expected_window,
                expected_features: self.expected_features.len(),
            });
        }
        self.check_feature_order(scaler.feature_names())?;

        if !self.model_path.exists() {
            return Err(ModelLoadError::ArtifactMissing {
                path: self.model_path.clone(),
            });
        }
        let session = Session::builder()
            .and_then(|mut builder| builder.commit_from_file(&self.model_path))
            .map_err(|e| ModelLoadError::ArtifactCorrupt {
                path: self.model_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(LoadedModel {
            model: Box::new(OnnxSequenceModel {
                session: Mutex::new(session),
                version: manifest.version,
            }),
            scaler,
        })
    }
}
