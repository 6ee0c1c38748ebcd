//! Run parameters for the heat-map and corpus-generation pipelines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{ErrorKind, PipelineError};
use crate::export::ArtifactFormat;
use crate::grid::{GridSpec, DEFAULT_RESOLUTION_DEG};
use crate::landmask::DEFAULT_COASTLINE_PATH;
use crate::model::{ModelConfig, TrainingTarget};
use crate::render::{IntensityTransform, RenderConfig};
use crate::samples::SamplerConfig;

/// Default corpus location.
pub const DEFAULT_CORPUS_PATH: &str = "synthetic_ocean_data_ocean_only.csv";
/// Default artifact location.
pub const DEFAULT_OUTPUT_PATH: &str = "shark_heatmap.html";

/// Parameters of one heat-map run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapParams {
    /// Corpus CSV to train on and grid over.
    pub input: PathBuf,
    /// Where the artifact is written.
    pub output: PathBuf,
    /// Grid resolution in degrees (both axes).
    pub grid_resolution: f64,
    /// Minimum presence probability for a heat point.
    pub threshold: f64,
    /// Held-out fraction for model evaluation.
    pub test_size: f64,
    /// Number of trees.
    pub n_estimators: usize,
    /// Land polygon shapefile.
    pub coastline: PathBuf,
    /// Target the forest learns.
    pub target: TrainingTarget,
    /// Score to intensity mapping.
    pub transform: IntensityTransform,
    /// Artifact format; inferred from `output` when unset.
    pub format: Option<ArtifactFormat>,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_CORPUS_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            grid_resolution: DEFAULT_RESOLUTION_DEG,
            threshold: 0.4,
            test_size: 0.2,
            n_estimators: 200,
            coastline: PathBuf::from(DEFAULT_COASTLINE_PATH),
            target: TrainingTarget::Heuristic,
            transform: IntensityTransform::Linear,
            format: None,
        }
    }
}

impl HeatmapParams {
    /// Loads parameters from a JSON file; missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::new(ErrorKind::Io, "config", format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::new(ErrorKind::Config, "config", format!("invalid {}: {e}", path.display()))
        })
    }

    /// Checks value ranges up front so a run fails before any work.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let bad = |message: String| Err(PipelineError::new(ErrorKind::Config, "config", message));

        if !(self.grid_resolution.is_finite() && self.grid_resolution > 0.0) {
            return bad(format!("grid resolution must be positive, got {}", self.grid_resolution));
        }
        if !self.threshold.is_finite() {
            return bad(format!("threshold must be finite, got {}", self.threshold));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return bad(format!("test size must be in (0, 1), got {}", self.test_size));
        }
        if self.n_estimators == 0 {
            return bad("at least one tree is required".to_string());
        }
        if let Err(e) = self.transform.validate() {
            return bad(e.to_string());
        }
        self.artifact_format()?;
        Ok(())
    }

    pub fn artifact_format(&self) -> Result<ArtifactFormat, PipelineError> {
        match self.format {
            Some(f) => Ok(f),
            None => ArtifactFormat::from_path(&self.output).map_err(|e| PipelineError::from_stage("config", e)),
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            target: self.target,
            ..ModelConfig::new(self.n_estimators, self.test_size)
        }
    }

    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::uniform(self.grid_resolution)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            threshold: self.threshold,
            transform: self.transform,
            ..Default::default()
        }
    }
}

/// Parameters of a synthetic corpus generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    pub output: PathBuf,
    pub coastline: PathBuf,
    pub sampler: SamplerConfig,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_CORPUS_PATH),
            coastline: PathBuf::from(DEFAULT_COASTLINE_PATH),
            sampler: SamplerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let params = HeatmapParams::default();
        assert_eq!(params.grid_resolution, 0.25);
        assert_eq!(params.threshold, 0.4);
        assert_eq!(params.n_estimators, 200);
        assert_eq!(params.artifact_format().unwrap(), ArtifactFormat::Html);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"threshold": 0.6, "output": "out.png", "target": "linear-blend"}"#).unwrap();

        let params = HeatmapParams::from_json_file(&path).unwrap();
        assert_eq!(params.threshold, 0.6);
        assert_eq!(params.n_estimators, 200);
        assert_eq!(params.target, TrainingTarget::LinearBlend);
        assert_eq!(params.artifact_format().unwrap(), ArtifactFormat::Png);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = HeatmapParams {
            grid_resolution: 0.0,
            ..Default::default()
        };
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::Config);

        params.grid_resolution = 1.0;
        params.output = PathBuf::from("map.bmp");
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::Config);

        let err = HeatmapParams::from_json_file("/nonexistent/params.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
