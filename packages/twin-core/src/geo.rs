//! Static geography: warehouse coordinates and recorded corridors.
//!
//! [`GeoIndex`] answers two questions for the dispatcher: where is a
//! location, and what line should be drawn between two locations. Corridors
//! are stored under a [`RouteKey`], so lookups are direction-independent.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque warehouse/city identifier (e.g. `WH1`).
pub type LocationId = String;

/// A `[longitude, latitude]` pair. Serializes as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    #[must_use]
    pub fn lon(&self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.1
    }

    /// Linear interpolation towards `other` (`t` in `[0, 1]`).
    #[must_use]
    pub fn lerp(&self, other: &LngLat, t: f64) -> LngLat {
        LngLat(
            self.0 + (other.0 - self.0) * t,
            self.1 + (other.1 - self.1) * t,
        )
    }

    /// Planar distance in degrees. Good enough for animation pacing.
    #[must_use]
    pub fn planar_distance(&self, other: &LngLat) -> f64 {
        (other.0 - self.0).hypot(other.1 - self.1)
    }
}

/// Ordered sequence of coordinates. At least two points when drawn as a line.
pub type PathGeometry = Vec<LngLat>;

/// Unordered pair of locations, canonicalized so `(a, b)` == `(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    low: LocationId,
    high: LocationId,
}

impl RouteKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// The lexicographically smaller endpoint.
    pub fn low(&self) -> &str {
        &self.low
    }

    /// The lexicographically larger endpoint.
    pub fn high(&self) -> &str {
        &self.high
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Location and corridor lookup.
#[derive(Debug, Clone, Default)]
pub struct GeoIndex {
    locations: HashMap<LocationId, LngLat>,
    corridors: HashMap<RouteKey, PathGeometry>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or moves) a location.
    pub fn insert_location(&mut self, id: impl Into<LocationId>, coord: LngLat) {
        self.locations.insert(id.into(), coord);
    }

    /// Records a corridor between `a` and `b`.
    ///
    /// The path is stored as given; lookups in either direction return it
    /// unchanged. Paths shorter than two points are ignored.
    pub fn insert_corridor(&mut self, a: &str, b: &str, path: PathGeometry) -> bool {
        if path.len() < 2 {
            log::warn!(
                "[Geo] Ignoring corridor {} with {} point(s)",
                RouteKey::new(a, b),
                path.len()
            );
            return false;
        }
        self.corridors.insert(RouteKey::new(a, b), path);
        true
    }

    pub fn coord(&self, id: &str) -> Option<LngLat> {
        self.locations.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locations.contains_key(id)
    }

    /// Iterates over all known locations.
    pub fn locations(&self) -> impl Iterator<Item = (&str, LngLat)> {
        self.locations.iter().map(|(id, c)| (id.as_str(), *c))
    }

    pub fn corridor_count(&self) -> usize {
        self.corridors.len()
    }

    /// Returns the line to draw between `a` and `b`.
    ///
    /// A recorded corridor wins. Otherwise a straight two-point line is
    /// synthesized in canonical key order, which keeps the result identical
    /// for `(a, b)` and `(b, a)`. Returns `None` when there is no corridor
    /// and either location is unknown.
    pub fn route_coords(&self, a: &str, b: &str) -> Option<PathGeometry> {
        let key = RouteKey::new(a, b);
        if let Some(path) = self.corridors.get(&key) {
            return Some(path.clone());
        }
        let low = self.coord(key.low())?;
        let high = self.coord(key.high())?;
        Some(vec![low, high])
    }

    /// Resolves a multi-hop location path into per-edge geometry.
    ///
    /// Edges whose geometry cannot be resolved are skipped with a warning.
    pub fn path_edges(&self, path: &[LocationId]) -> Vec<PathGeometry> {
        path.windows(2)
            .filter_map(|pair| {
                let coords = self.route_coords(&pair[0], &pair[1]);
                if coords.is_none() {
                    log::warn!(
                        "[Geo] No geometry for edge {} -> {} (unknown location)",
                        pair[0],
                        pair[1]
                    );
                }
                coords
            })
            .collect()
    }

    /// Coordinates of every known location in `ids`, in order.
    pub fn coords_of<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<LngLat> {
        ids.into_iter().filter_map(|id| self.coord(id)).collect()
    }

    /// Built-in demo geography: Delhi, Mumbai and Hyderabad with the three
    /// corridors between them.
    pub fn demo() -> Self {
        let delhi = LngLat(77.2090, 28.6139);
        let mumbai = LngLat(72.8777, 19.0760);
        let hyderabad = LngLat(78.4867, 17.3850);

        let mut index = Self::new();
        index.insert_location("WH1", delhi);
        index.insert_location("WH2", mumbai);
        index.insert_location("WH4", hyderabad);
        index.insert_corridor("WH1", "WH4", vec![delhi, hyderabad]);
        index.insert_corridor("WH1", "WH2", vec![delhi, mumbai]);
        index.insert_corridor("WH2", "WH4", vec![mumbai, hyderabad]);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_index() -> GeoIndex {
        let mut index = GeoIndex::new();
        index.insert_location("WH1", LngLat(77.2090, 28.6139));
        index.insert_location("WH2", LngLat(72.8777, 19.0760));
        index.insert_location("WH4", LngLat(78.4867, 17.3850));
        index.insert_corridor(
            "WH4",
            "WH1",
            vec![
                LngLat(78.4867, 17.3850),
                LngLat(78.0, 23.0),
                LngLat(77.2090, 28.6139),
            ],
        );
        index
    }

    #[test]
    fn route_key_is_canonical() {
        assert_eq!(RouteKey::new("WH4", "WH1"), RouteKey::new("WH1", "WH4"));
        assert_eq!(RouteKey::new("WH4", "WH1").to_string(), "WH1-WH4");
    }

    #[test]
    fn route_coords_is_symmetric() {
        let index = sparse_index();
        for (a, b) in [("WH1", "WH4"), ("WH1", "WH2"), ("WH2", "WH4")] {
            assert_eq!(index.route_coords(a, b), index.route_coords(b, a));
        }
    }

    #[test]
    fn recorded_corridor_wins_over_straight_line() {
        let index = sparse_index();
        let path = index.route_coords("WH1", "WH4").unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn missing_corridor_falls_back_to_two_points() {
        let index = sparse_index();
        let path = index.route_coords("WH1", "WH2").unwrap();
        assert_eq!(
            path,
            vec![index.coord("WH1").unwrap(), index.coord("WH2").unwrap()]
        );
    }

    #[test]
    fn reversed_fallback_keeps_canonical_order() {
        let index = sparse_index();
        let path = index.route_coords("WH2", "WH1").unwrap();
        assert_eq!(
            path,
            vec![index.coord("WH1").unwrap(), index.coord("WH2").unwrap()]
        );
    }

    #[test]
    fn unknown_location_has_no_geometry() {
        let index = sparse_index();
        assert!(index.route_coords("WH1", "WH9").is_none());
    }

    #[test]
    fn short_corridor_is_ignored() {
        let mut index = GeoIndex::new();
        assert!(!index.insert_corridor("A", "B", vec![LngLat(0.0, 0.0)]));
        assert_eq!(index.corridor_count(), 0);
    }

    #[test]
    fn path_edges_skip_unresolvable_hops() {
        let index = sparse_index();
        let path: Vec<LocationId> = ["WH1", "WH2", "WH9", "WH4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let edges = index.path_edges(&path);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn lnglat_serializes_as_array() {
        let json = serde_json::to_string(&LngLat(77.5, 28.25)).unwrap();
        assert_eq!(json, "[77.5,28.25]");
    }
}
