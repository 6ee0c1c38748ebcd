//! JSON export of a heat layer.

use super::ExportError;
use crate::render::HeatLayer;

/// Serializes the full layer (points, view and style) as pretty JSON.
pub fn encode_json(layer: &HeatLayer) -> Result<Vec<u8>, ExportError> {
    let mut bytes = serde_json::to_vec_pretty(layer)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_layer;

    #[test]
    fn test_json_structure() {
        let bytes = encode_json(&sample_layer()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let points = value["points"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1]["intensity"], 0.9);
        assert_eq!(value["radius"], 8);
        assert_eq!(value["bounds"]["lat_min"], -20.0);
    }
}
