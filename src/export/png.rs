//! Equirectangular PNG raster of a heat layer.
//!
//! The image spans the full globe: x maps longitude -180..180 and y maps
//! latitude 90..-90. Cells outside the heat layer stay transparent so the
//! raster can be overlaid on any basemap.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Rgba};

use super::ExportError;
use crate::render::HeatLayer;

/// Options for PNG raster export.
#[derive(Debug, Clone)]
pub struct PngRasterOptions {
    /// Output width in pixels (height is half of it unless set).
    pub width: u32,
    /// Output height in pixels. If None, defaults to `width / 2`.
    pub height: Option<u32>,
    /// Splat radius in pixels around each point.
    pub point_radius: u32,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngRasterOptions {
    fn default() -> Self {
        Self {
            width: 1440,
            height: None,
            point_radius: 1,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

/// Blue, lime, red ramp matching the leaflet.heat default gradient.
pub fn heat_color(intensity: f64) -> [u8; 3] {
    const STOPS: [(f64, [f64; 3]); 3] = [(0.4, [0.0, 0.0, 255.0]), (0.65, [0.0, 255.0, 0.0]), (1.0, [255.0, 0.0, 0.0])];

    let t = if intensity.is_finite() { intensity.clamp(0.0, 1.0) } else { 0.0 };
    if t <= STOPS[0].0 {
        return [0, 0, 255];
    }
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return std::array::from_fn(|k| (c0[k] + (c1[k] - c0[k]) * f).round() as u8);
        }
    }
    [255, 0, 0]
}

/// Encodes the layer as an RGBA8 PNG in memory.
///
/// Overlapping splats keep the highest intensity.
pub fn encode_png(layer: &HeatLayer, options: &PngRasterOptions) -> Result<Vec<u8>, ExportError> {
    let w = options.width;
    let h = options.height.unwrap_or(w / 2);
    if w < 2 || h < 2 {
        return Err(ExportError::InvalidDimensions(w, h));
    }

    let mut strongest = vec![f64::NEG_INFINITY; (w as usize) * (h as usize)];
    let r = options.point_radius as i64;

    for p in &layer.points {
        let u = (p.longitude + 180.0) / 360.0;
        let v = (90.0 - p.latitude) / 180.0;
        if !(u.is_finite() && v.is_finite()) {
            continue;
        }
        let cx = ((u * w as f64).floor() as i64).clamp(0, w as i64 - 1);
        let cy = ((v * h as f64).floor() as i64).clamp(0, h as i64 - 1);

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let y = cy + dy;
                if y < 0 || y >= h as i64 {
                    continue;
                }
                // Longitude wraps around the antimeridian.
                let x = (cx + dx).rem_euclid(w as i64);
                let idx = y as usize * w as usize + x as usize;
                if p.intensity > strongest[idx] {
                    strongest[idx] = p.intensity;
                }
            }
        }
    }

    let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(w, h);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let s = strongest[i];
        if s.is_finite() {
            let [red, green, blue] = heat_color(s);
            let alpha = (64.0 + 191.0 * s.clamp(0.0, 1.0)).round() as u8;
            *pixel = Rgba([red, green, blue, alpha]);
        }
    }

    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, options.compression, options.filter);
    encoder.write_image(img.as_raw(), w, h, image::ExtendedColorType::Rgba8)?;
    Ok(bytes)
}
