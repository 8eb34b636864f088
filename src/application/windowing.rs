//! Feature windowing and min-max scaling.
//!
//! The windower produces the exact fixed-shape `(W, F)` matrix the
//! sequence model was trained on: configured feature columns in artifact
//! order, rows with any absent indicator dropped, the most recent `W`
//! valid rows ending at the prediction anchor, scaled into [0, 1] with
//! the fitted per-feature min/max.

use crate::domain::errors::{ModelLoadError, PredictionError};
use crate::domain::feature_registry::Feature;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fitted range for one feature, in training order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScale {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    version: String,
    features: Vec<FeatureScale>,
}

/// Immutable min-max parameters fitted at training time.
///
/// Loaded once per process alongside the model and shared read-only
/// across requests. The feature order here is the training order; the
/// loader checks it against both the model manifest and the configured
/// feature list before any inference happens.
#[derive(Debug, Clone)]
pub struct Scaler {
    version: String,
    features: Vec<FeatureScale>,
}

impl Scaler {
    pub fn new(version: impl Into<String>, features: Vec<FeatureScale>) -> anyhow::Result<Self> {
        anyhow::ensure!(!features.is_empty(), "scaler has no features");
        for fs in &features {
            anyhow::ensure!(
                fs.max > fs.min,
                "scaler feature '{}' has empty range [{}, {}]",
                fs.name,
                fs.min,
                fs.max
            );
        }
        Ok(Self {
            version: version.into(),
            features,
        })
    }

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
        let artifact: ScalerArtifact =
            serde_json::from_str(&raw).map_err(|e| ModelLoadError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::new(artifact.version, artifact.features).map_err(|e| {
            ModelLoadError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    /// Scales a raw value into [0, 1]. Values outside the fit-time range
    /// are clamped rather than extrapolated: inference stays inside the
    /// domain the model was trained on.
    pub fn scale(&self, feature_idx: usize, value: f64) -> f64 {
        let fs = &self.features[feature_idx];
        ((value - fs.min) / (fs.max - fs.min)).clamp(0.0, 1.0)
    }

    /// Maps a scaled value back into feature units. Not clamped: a model
    /// output slightly outside [0, 1] is a legitimate out-of-range
    /// prediction, not an input to re-bound.
    pub fn inverse(&self, feature_idx: usize, scaled: f64) -> f64 {
        let fs = &self.features[feature_idx];
        fs.min + scaled * (fs.max - fs.min)
    }
}

/// Assembles scaled `(W, F)` input windows from indicator columns.
#[derive(Debug, Clone)]
pub struct FeatureWindower {
    window: usize,
    features: Vec<Feature>,
}

impl FeatureWindower {
    pub fn new(window: usize, features: Vec<Feature>) -> Self {
        Self { window, features }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Builds the model input ending at the most recent bar.
    ///
    /// Rows with any absent feature are dropped before windowing, so
    /// indicator warmup shortens the usable history instead of leaking
    /// placeholder values into the model.
    pub fn build(
        &self,
        columns: &[Vec<Option<f64>>],
        scaler: &Scaler,
    ) -> Result<Array2<f32>, PredictionError> {
        debug_assert_eq!(columns.len(), self.features.len());
        debug_assert_eq!(scaler.len(), self.features.len());

        let n = columns.first().map_or(0, Vec::len);
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n);
        for i in 0..n {
            let row: Option<Vec<f64>> = columns.iter().map(|col| col[i]).collect();
            if let Some(row) = row {
                rows.push(row);
            }
        }

        if rows.len() < self.window {
            return Err(PredictionError::InsufficientHistory {
                required: self.window,
                available: rows.len(),
            });
        }

        let tail = &rows[rows.len() - self.window..];
        let mut matrix = Array2::<f32>::zeros((self.window, self.features.len()));
        for (r, row) in tail.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                matrix[[r, c]] = scaler.scale(c, value) as f32;
            }
        }
        Ok(matrix)
    }

    /// Recovers the predicted close in price units from the model's
    /// scaled output.
    pub fn inverse_close(&self, scaler: &Scaler, scaled: f64) -> f64 {
        let idx = self
            .features
            .iter()
            .position(|f| *f == Feature::Close)
            .expect("close feature presence is validated at configuration time");
        scaler.inverse(idx, scaled)
    }
}
