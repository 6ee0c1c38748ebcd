//! Self-contained Leaflet page with a heat layer.
//!
//! The page pulls Leaflet and leaflet.heat from a CDN and inlines the points,
//! so the artifact can be opened straight from disk or served as a static
//! file.

use crate::render::HeatLayer;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";
const TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

/// Renders the layer as an HTML document.
pub fn render_html(layer: &HeatLayer) -> String {
    let mut points = String::with_capacity(layer.points.len() * 32 + 2);
    points.push('[');
    for (i, p) in layer.points.iter().enumerate() {
        if i > 0 {
            points.push(',');
        }
        points.push_str(&format!("[{:.5},{:.5},{:.4}]", p.latitude, p.longitude, p.intensity));
    }
    points.push(']');

    let (lat, lon) = layer.center;

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Shark presence heat map</title>
<link rel="stylesheet" href="{LEAFLET_CSS}">
<style>
  html, body, #map {{ height: 100%; margin: 0; }}
  .legend {{ background: white; padding: 6px 8px; font: 12px sans-serif; border-radius: 4px; }}
</style>
</head>
<body>
<div id="map"></div>
<script src="{LEAFLET_JS}"></script>
<script src="{LEAFLET_HEAT_JS}"></script>
<script>
  var map = L.map('map').setView([{lat:.5}, {lon:.5}], {zoom});
  L.tileLayer('{TILE_URL}', {{
    attribution: '{TILE_ATTRIBUTION}',
    subdomains: 'abcd',
    maxZoom: 19
  }}).addTo(map);
  var points = {points};
  L.heatLayer(points, {{ radius: {radius}, blur: {blur}, maxZoom: {max_zoom} }}).addTo(map);
  var legend = L.control({{ position: 'bottomright' }});
  legend.onAdd = function () {{
    var div = L.DomUtil.create('div', 'legend');
    div.innerHTML = 'P(shark) &ge; {threshold} &middot; ' + points.length + ' cells';
    return div;
  }};
  legend.addTo(map);
</script>
</body>
</html>
"#,
        zoom = layer.zoom,
        radius = layer.radius,
        blur = layer.blur,
        max_zoom = layer.max_zoom,
        threshold = layer.threshold,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_layer;

    #[test]
    fn test_html_contains_layer() {
        let html = render_html(&sample_layer());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("[-10.00000,30.00000,0.5000]"));
        assert!(html.contains("[45.00000,-120.00000,0.9000]"));
        assert!(html.contains("radius: 8, blur: 15, maxZoom: 6"));
        assert!(html.contains("setView([15.00000, -45.00000], 3)"));
        assert!(html.contains("light_all"));
    }

    #[test]
    fn test_empty_layer_is_valid_page() {
        let mut layer = sample_layer();
        layer.points.clear();
        let html = render_html(&layer);
        assert!(html.contains("var points = [];"));
    }
}
