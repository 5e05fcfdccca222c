//! Static overlays installed once the base style is ready.
//!
//! The plan is pure data: which sources, layers and markers to add and where
//! each layer goes in the render order. Issuing it against the map is the
//! controller's job, and only possible with a `StyleReady` proof.

use geojson::{Feature, FeatureCollection, Geometry, Value as GeoValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::event::LngLat;

pub const BUILDINGS_SOURCE: &str = "openmaptiles";
pub const BUILDINGS_LAYER: &str = "3d-buildings";
pub const PARK_SOURCE: &str = "national-park";
pub const PARK_BOUNDARY_LAYER: &str = "park-boundary";
pub const PARK_VOLCANOES_LAYER: &str = "park-volcanoes";

const PARK_BOUNDARY: [(f64, f64); 18] = [
    (-121.353637, 40.584978),
    (-121.284551, 40.584758),
    (-121.275349, 40.541646),
    (-121.246768, 40.541017),
    (-121.251343, 40.423383),
    (-121.32687, 40.423768),
    (-121.360619, 40.43479),
    (-121.363694, 40.409124),
    (-121.439713, 40.409197),
    (-121.439711, 40.423791),
    (-121.572133, 40.423548),
    (-121.577415, 40.550766),
    (-121.539486, 40.558107),
    (-121.520284, 40.572459),
    (-121.487219, 40.550822),
    (-121.446951, 40.56319),
    (-121.370644, 40.563267),
    (-121.353637, 40.584978),
];

const PARK_VOLCANOES: [(f64, f64); 3] = [
    (-121.415061, 40.506229),
    (-121.505184, 40.488084),
    (-121.354465, 40.488737),
];

const PRICE_MARKERS: [(u32, f64, f64, &str); 3] = [
    (1, -121.42, 40.49, "$450K"),
    (2, -121.45, 40.50, "$325K"),
    (3, -121.46, 40.47, "$500K"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("could not encode overlay fixture: {0}")]
    Fixture(String),

    #[error("base style already has a layer named '{0}'")]
    LayerExists(String),

    #[error("invalid marker coordinate: {0}")]
    Marker(String),
}

/// A layer of the loaded base style, as reported by the shell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Map<String, Value>>,
}

impl StyleLayer {
    /// Symbol layers that draw text.
    pub fn is_label(&self) -> bool {
        self.kind == "symbol"
            && self
                .layout
                .as_ref()
                .is_some_and(|layout| layout.contains_key("text-field"))
    }
}

pub fn label_anchor(layers: &[StyleLayer]) -> Option<&StyleLayer> {
    layers.iter().find(|layer| layer.is_label())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    Vector { url: String },
    #[serde(rename = "geojson")]
    GeoJson { data: Value },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    FillExtrusion,
    Fill,
    Circle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub paint: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub coordinates: LngLat,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayStep {
    Source { id: String, source: SourceSpec },
    Layer { layer: LayerSpec, before: Option<String> },
    Marker(Marker),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayStatus {
    #[default]
    Pending,
    Installed,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayPlan {
    anchor: Option<String>,
    steps: Vec<OverlayStep>,
}

impl OverlayPlan {
    pub fn build(tiles_url: &Url, style_layers: &[StyleLayer]) -> Result<Self, OverlayError> {
        let ours = [BUILDINGS_LAYER, PARK_BOUNDARY_LAYER, PARK_VOLCANOES_LAYER];
        if let Some(clash) = style_layers.iter().find(|l| ours.contains(&l.id.as_str())) {
            return Err(OverlayError::LayerExists(clash.id.clone()));
        }

        let anchor = label_anchor(style_layers).map(|layer| layer.id.clone());
        let park = serde_json::to_value(national_park())
            .map_err(|e| OverlayError::Fixture(e.to_string()))?;

        let mut steps = vec![
            OverlayStep::Source {
                id: BUILDINGS_SOURCE.to_string(),
                source: SourceSpec::Vector {
                    url: tiles_url.to_string(),
                },
            },
            OverlayStep::Source {
                id: PARK_SOURCE.to_string(),
                source: SourceSpec::GeoJson { data: park },
            },
            OverlayStep::Layer {
                layer: park_boundary_layer(),
                before: None,
            },
            OverlayStep::Layer {
                layer: park_volcanoes_layer(),
                before: None,
            },
            // last, so that without a label anchor it ends up on top
            OverlayStep::Layer {
                layer: buildings_layer(),
                before: anchor.clone(),
            },
        ];

        for (id, lng, lat, label) in PRICE_MARKERS {
            let coordinates =
                LngLat::new(lng, lat).map_err(|e| OverlayError::Marker(e.to_string()))?;
            steps.push(OverlayStep::Marker(Marker {
                id,
                coordinates,
                label: label.to_string(),
            }));
        }

        Ok(Self { anchor, steps })
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn steps(&self) -> &[OverlayStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<OverlayStep> {
        self.steps
    }
}

fn national_park() -> FeatureCollection {
    let ring = PARK_BOUNDARY
        .iter()
        .map(|&(lng, lat)| vec![lng, lat])
        .collect::<Vec<_>>();

    let mut features = vec![feature(GeoValue::Polygon(vec![ring]))];
    features.extend(
        PARK_VOLCANOES
            .iter()
            .map(|&(lng, lat)| feature(GeoValue::Point(vec![lng, lat]))),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(value: GeoValue) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

fn buildings_layer() -> LayerSpec {
    LayerSpec {
        id: BUILDINGS_LAYER.to_string(),
        kind: LayerKind::FillExtrusion,
        source: BUILDINGS_SOURCE.to_string(),
        source_layer: Some("building".to_string()),
        minzoom: Some(15.0),
        filter: Some(json!(["!=", ["get", "hide_3d"], true])),
        paint: json!({
            "fill-extrusion-color": [
                "interpolate", ["linear"], ["get", "render_height"],
                0, "lightgray", 200, "royalblue", 400, "lightblue"
            ],
            "fill-extrusion-height": [
                "interpolate", ["linear"], ["zoom"],
                15, 0, 16, ["get", "render_height"]
            ],
            "fill-extrusion-base": [
                "case", [">=", ["get", "zoom"], 16], ["get", "render_min_height"], 0
            ]
        }),
    }
}

fn park_boundary_layer() -> LayerSpec {
    LayerSpec {
        id: PARK_BOUNDARY_LAYER.to_string(),
        kind: LayerKind::Fill,
        source: PARK_SOURCE.to_string(),
        source_layer: None,
        minzoom: None,
        filter: Some(json!(["==", "$type", "Polygon"])),
        paint: json!({ "fill-color": "#888888", "fill-opacity": 0.4 }),
    }
}

fn park_volcanoes_layer() -> LayerSpec {
    LayerSpec {
        id: PARK_VOLCANOES_LAYER.to_string(),
        kind: LayerKind::Circle,
        source: PARK_SOURCE.to_string(),
        source_layer: None,
        minzoom: None,
        filter: Some(json!(["==", "$type", "Point"])),
        paint: json!({ "circle-radius": 6, "circle-color": "#B42222" }),
    }
}
