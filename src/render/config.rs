//! Heat layer styling and filtering configuration.

use serde::{Deserialize, Serialize};

use super::RenderError;

/// Maps a presence score to a heat intensity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IntensityTransform {
    /// Intensity equals the score.
    #[default]
    Linear,
    /// Intensity is `score^gamma`; gamma < 1 lifts faint cells.
    Power { gamma: f64 },
}

impl IntensityTransform {
    pub fn validate(&self) -> Result<(), RenderError> {
        match *self {
            IntensityTransform::Linear => Ok(()),
            IntensityTransform::Power { gamma } if gamma.is_finite() && gamma > 0.0 => Ok(()),
            IntensityTransform::Power { gamma } => Err(RenderError::InvalidGamma(gamma)),
        }
    }

    #[inline]
    pub fn apply(&self, score: f64) -> f64 {
        match *self {
            IntensityTransform::Linear => score,
            IntensityTransform::Power { gamma } => score.max(0.0).powf(gamma),
        }
    }
}

/// Parameters for the rendered heat layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Minimum presence probability for a cell to appear (inclusive).
    pub threshold: f64,
    /// Score to intensity mapping.
    pub transform: IntensityTransform,
    /// Heat point radius in pixels.
    pub radius: u32,
    /// Blur radius in pixels.
    pub blur: u32,
    /// Zoom level at which points reach full intensity.
    pub max_zoom: u32,
    /// Initial map zoom.
    pub initial_zoom: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            transform: IntensityTransform::Linear,
            radius: 8,
            blur: 15,
            max_zoom: 6,
            initial_zoom: 3,
        }
    }
}

impl RenderConfig {
    /// Default styling with a custom threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if !self.threshold.is_finite() {
            return Err(RenderError::InvalidThreshold(self.threshold));
        }
        self.transform.validate()?;
        if self.radius == 0 {
            return Err(RenderError::InvalidStyle {
                field: "radius",
                value: 0.0,
            });
        }
        Ok(())
    }
}
