//! Map widget abstraction.
//!
//! The dispatcher never touches a rendering widget directly. It talks to a
//! [`MapAdapter`], which owns a fixed set of named vector layers and can fit
//! the view to a set of points. Layer data is GeoJSON so a real widget can
//! consume it as-is.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::geo::LngLat;

/// Named vector layers maintained on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Disrupted route (red).
    Alert,
    /// Active detour (green).
    Fix,
    /// Warehouse markers.
    Warehouses,
    /// Corridor network from the scenario seed.
    Roads,
    /// Animated truck positions.
    Trucks,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Fix => "fix",
            Self::Warehouses => "warehouses",
            Self::Roads => "roads",
            Self::Trucks => "trucks",
        }
    }
}

/// GeoJSON geometry subset used by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<LngLat> },
    Point { coordinates: LngLat },
}

/// GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn line(coordinates: Vec<LngLat>) -> Self {
        Self {
            geometry: Geometry::LineString { coordinates },
            properties: Map::new(),
        }
    }

    pub fn point(coordinates: LngLat) -> Self {
        Self {
            geometry: Geometry::Point { coordinates },
            properties: Map::new(),
        }
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// GeoJSON feature collection - the unit of "set layer data".
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// One line feature per path.
    pub fn lines(paths: impl IntoIterator<Item = Vec<LngLat>>) -> Self {
        Self::new(paths.into_iter().map(Feature::line).collect())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Trait for driving a map widget.
///
/// Implementations must be cheap to call from the dispatcher: they may
/// queue work for a renderer but must not block.
pub trait MapAdapter: Send + Sync {
    /// Replaces all data on `layer`.
    fn set_layer(&self, layer: Layer, data: FeatureCollection);

    /// Moves the view so every point is visible.
    fn fit_view(&self, points: &[LngLat]);

    /// Removes all data from `layer`.
    fn clear_layer(&self, layer: Layer) {
        self.set_layer(layer, FeatureCollection::empty());
    }
}

/// No-op map for headless runs where nothing is rendered.
pub struct NoopMapAdapter;

impl MapAdapter for NoopMapAdapter {
    fn set_layer(&self, _layer: Layer, _data: FeatureCollection) {}

    fn fit_view(&self, _points: &[LngLat]) {}
}

/// Logging map for the terminal client and debugging.
///
/// The trucks layer changes every animation frame, so it is logged at trace
/// level only.
pub struct LoggingMapAdapter;

impl MapAdapter for LoggingMapAdapter {
    fn set_layer(&self, layer: Layer, data: FeatureCollection) {
        if layer == Layer::Trucks {
            tracing::trace!(layer = layer.as_str(), features = data.len(), "layer_updated");
        } else {
            tracing::info!(layer = layer.as_str(), features = data.len(), "layer_updated");
        }
    }

    fn fit_view(&self, points: &[LngLat]) {
        tracing::info!(?points, "fit_view");
    }
}

/// In-memory map that remembers the last data of each layer and every fit
/// request. Used by tests and by embedders that render from a snapshot.
#[derive(Default)]
pub struct RecordingMapAdapter {
    layers: Mutex<HashMap<Layer, FeatureCollection>>,
    fits: Mutex<Vec<Vec<LngLat>>>,
    updates: Mutex<Vec<Layer>>,
}

impl RecordingMapAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last data written to `layer` (`None` if never written).
    pub fn layer(&self, layer: Layer) -> Option<FeatureCollection> {
        self.layers.lock().get(&layer).cloned()
    }

    /// Number of features currently on `layer`.
    pub fn feature_count(&self, layer: Layer) -> usize {
        self.layers.lock().get(&layer).map_or(0, FeatureCollection::len)
    }

    /// Every fit-view request, oldest first.
    pub fn fit_requests(&self) -> Vec<Vec<LngLat>> {
        self.fits.lock().clone()
    }

    /// Every layer write, oldest first.
    pub fn updates(&self) -> Vec<Layer> {
        self.updates.lock().clone()
    }
}

impl MapAdapter for RecordingMapAdapter {
    fn set_layer(&self, layer: Layer, data: FeatureCollection) {
        self.updates.lock().push(layer);
        self.layers.lock().insert(layer, data);
    }

    fn fit_view(&self, points: &[LngLat]) {
        self.fits.lock().push(points.to_vec());
    }
}
