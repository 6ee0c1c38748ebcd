//! Export module for writing heat layers to disk.
//!
//! Supports multiple output formats:
//! - Interactive HTML map (Leaflet + leaflet.heat)
//! - JSON heat layer for downstream tools
//! - Equirectangular RGBA PNG raster

mod html;
mod json;
mod png;

pub use html::render_html;
pub use json::encode_json;
pub use png::{encode_png, heat_color, PngRasterOptions};

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::HeatLayer;
use crate::store::write_atomic;

/// Errors that can occur during export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown artifact format: '{0}'")]
    UnknownFormat(String),
    #[error("Invalid output dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),
}

/// Output format of a rendered heat layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    #[default]
    Html,
    Json,
    Png,
}

impl ArtifactFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Html => "html",
            ArtifactFormat::Json => "json",
            ArtifactFormat::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Result<Self, ExportError> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ArtifactFormat::Html),
            "json" => Ok(ArtifactFormat::Json),
            "png" => Ok(ArtifactFormat::Png),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }

    /// Infers the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ExportError::UnknownFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}

/// Encodes a heat layer in the given format.
pub fn encode_layer(layer: &HeatLayer, format: ArtifactFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ArtifactFormat::Html => Ok(render_html(layer).into_bytes()),
        ArtifactFormat::Json => encode_json(layer),
        ArtifactFormat::Png => encode_png(layer, &PngRasterOptions::default()),
    }
}

/// Encodes `layer` and writes it atomically to `path`.
///
/// # Arguments
/// * `layer` - The heat layer to export
/// * `path` - Output file path
/// * `format` - Output format
///
/// # Returns
/// `Ok(())` on success; on failure no file appears at `path`
pub fn export_layer(layer: &HeatLayer, path: &Path, format: ArtifactFormat) -> Result<(), ExportError> {
    let bytes = encode_layer(layer, format)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grid::BoundingBox;
    use crate::render::{HeatPoint, RenderConfig};
    use tempfile::tempdir;

    pub(crate) fn sample_layer() -> HeatLayer {
        let points = vec![
            HeatPoint {
                latitude: -10.0,
                longitude: 30.0,
                intensity: 0.5,
            },
            HeatPoint {
                latitude: 45.0,
                longitude: -120.0,
                intensity: 0.9,
            },
        ];
        let bounds = BoundingBox {
            lat_min: -20.0,
            lat_max: 50.0,
            lon_min: -130.0,
            lon_max: 40.0,
        };
        HeatLayer::new(points, &[], bounds, &RenderConfig::default())
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ArtifactFormat::from_path(Path::new("a/b.HTML")).unwrap(), ArtifactFormat::Html);
        assert_eq!(ArtifactFormat::from_path(Path::new("x.json")).unwrap(), ArtifactFormat::Json);
        assert_eq!("png".parse::<ArtifactFormat>().unwrap(), ArtifactFormat::Png);
        assert!(ArtifactFormat::from_path(Path::new("noext")).is_err());
        assert!(ArtifactFormat::from_path(Path::new("map.tiff")).is_err());
    }

    #[test]
    fn test_export_every_format() {
        let dir = tempdir().unwrap();
        let layer = sample_layer();

        for format in [ArtifactFormat::Html, ArtifactFormat::Json, ArtifactFormat::Png] {
            let path = dir.path().join(format!("layer.{}", format.extension()));
            export_layer(&layer, &path, format).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert!(!bytes.is_empty(), "{format:?} export is empty");
        }
    }
}
