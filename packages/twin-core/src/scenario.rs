//! Scenario bootstrap: warehouses, corridors, baseline stats and seed trucks.
//!
//! Backends that serve a scenario endpoint describe the network in one JSON
//! document. When the endpoint is disabled or unusable the client runs on the
//! built-in offline seed instead.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{TwinError, TwinResult};
use crate::geo::{GeoIndex, LngLat, LocationId, PathGeometry};
use crate::map::{Feature, FeatureCollection, Layer, MapAdapter};
use crate::stats::{StatRecord, StatsTable};
use crate::trucks::{SharedFleet, TruckAdd};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub name: LocationId,
    pub lonlat: LngLat,
}

/// A corridor path, given either as raw coordinates or as location ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorridorPath {
    Coords(PathGeometry),
    Locations(Vec<LocationId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub path: CorridorPath,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<LocationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<LocationId>,
}

fn default_status() -> String {
    "open".to_string()
}

/// Coordinates closer than this (in degrees) name the same place.
const COORD_MATCH_EPSILON: f64 = 1e-6;

impl Corridor {
    /// Endpoints named by the corridor itself: explicit `from`/`to`, else the
    /// first and last ids of a location path.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            return Some((from.as_str(), to.as_str()));
        }
        match &self.path {
            CorridorPath::Locations(ids) if ids.len() >= 2 => {
                Some((ids[0].as_str(), ids[ids.len() - 1].as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    #[serde(alias = "wh")]
    pub name: LocationId,
    #[serde(default)]
    pub inventory: u64,
    #[serde(default)]
    pub inbound: u64,
    #[serde(default)]
    pub outbound: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedTruck {
    pub id: String,
    pub origin: LocationId,
    pub destination: LocationId,
}

/// Complete scenario document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
    #[serde(default)]
    pub corridors: Vec<Corridor>,
    #[serde(default)]
    pub dashboard: Vec<DashboardRow>,
    #[serde(default)]
    pub trucks: Vec<SeedTruck>,
}

/// Geography and baseline derived from a scenario.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub geo: GeoIndex,
    pub baseline: StatsTable,
}

impl Scenario {
    /// Built-in seed: Delhi, Mumbai and Hyderabad.
    pub fn offline() -> Self {
        let delhi = LngLat(77.2090, 28.6139);
        let mumbai = LngLat(72.8777, 19.0760);
        let hyderabad = LngLat(78.4867, 17.3850);
        let corridor = |from: &str, to: &str, a: LngLat, b: LngLat| Corridor {
            path: CorridorPath::Coords(vec![a, b]),
            status: default_status(),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
        };
        let row = |name: &str, inventory, inbound, outbound| DashboardRow {
            name: name.to_string(),
            inventory,
            inbound,
            outbound,
        };

        Self {
            warehouses: vec![
                Warehouse {
                    name: "WH1".into(),
                    lonlat: delhi,
                },
                Warehouse {
                    name: "WH2".into(),
                    lonlat: mumbai,
                },
                Warehouse {
                    name: "WH4".into(),
                    lonlat: hyderabad,
                },
            ],
            corridors: vec![
                corridor("WH1", "WH4", delhi, hyderabad),
                corridor("WH1", "WH2", delhi, mumbai),
                corridor("WH2", "WH4", mumbai, hyderabad),
            ],
            dashboard: vec![
                row("WH1", 120, 4, 6),
                row("WH2", 80, 3, 2),
                row("WH4", 60, 5, 1),
            ],
            trucks: Vec::new(),
        }
    }

    /// Parses a scenario document and checks it has something to draw.
    pub fn from_json(text: &str) -> TwinResult<Self> {
        let scenario: Self = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> TwinResult<()> {
        if self.warehouses.is_empty() {
            return Err(TwinError::Scenario("no warehouses".into()));
        }
        Ok(())
    }

    /// Builds the location index and the stats baseline.
    pub fn seeded(&self) -> Seeded {
        let mut geo = GeoIndex::new();
        for wh in &self.warehouses {
            geo.insert_location(wh.name.clone(), wh.lonlat);
        }
        for corridor in &self.corridors {
            let Some((from, to)) = self.corridor_endpoints(corridor) else {
                log::debug!("[Scenario] Corridor without known endpoints drawn only");
                continue;
            };
            let path = self.corridor_geometry(corridor, &geo);
            geo.insert_corridor(from, to, path);
        }

        let baseline = self
            .dashboard
            .iter()
            .map(|r| {
                (
                    r.name.clone(),
                    StatRecord::new(r.inventory, r.inbound, r.outbound),
                )
            })
            .collect();

        Seeded { geo, baseline }
    }

    /// Endpoints of a corridor. Coordinate paths without `from`/`to` are
    /// matched to the warehouses at their first and last points.
    fn corridor_endpoints<'a>(&'a self, corridor: &'a Corridor) -> Option<(&'a str, &'a str)> {
        if let Some(ends) = corridor.endpoints() {
            return Some(ends);
        }
        let CorridorPath::Coords(coords) = &corridor.path else {
            return None;
        };
        let from = self.warehouse_at(coords.first()?)?;
        let to = self.warehouse_at(coords.last()?)?;
        (from != to).then_some((from, to))
    }

    fn warehouse_at(&self, at: &LngLat) -> Option<&str> {
        self.warehouses
            .iter()
            .find(|wh| {
                (wh.lonlat.lon() - at.lon()).abs() < COORD_MATCH_EPSILON
                    && (wh.lonlat.lat() - at.lat()).abs() < COORD_MATCH_EPSILON
            })
            .map(|wh| wh.name.as_str())
    }

    fn corridor_geometry(&self, corridor: &Corridor, geo: &GeoIndex) -> PathGeometry {
        match &corridor.path {
            CorridorPath::Coords(coords) => coords.clone(),
            CorridorPath::Locations(ids) => geo.coords_of(ids.iter().map(String::as_str)),
        }
    }

    /// Point features for the warehouses layer.
    pub fn warehouse_features(&self) -> FeatureCollection {
        FeatureCollection::new(
            self.warehouses
                .iter()
                .map(|wh| Feature::point(wh.lonlat).with_property("name", wh.name.clone()))
                .collect(),
        )
    }

    /// Line features for the roads layer.
    pub fn road_features(&self, geo: &GeoIndex) -> FeatureCollection {
        FeatureCollection::new(
            self.corridors
                .iter()
                .filter_map(|c| {
                    let path = self.corridor_geometry(c, geo);
                    (path.len() >= 2)
                        .then(|| Feature::line(path).with_property("status", c.status.clone()))
                })
                .collect(),
        )
    }

    /// Draws the static layers, seeds the fleet and returns the geography
    /// and baseline for the dispatcher.
    pub fn apply(&self, map: &dyn MapAdapter, fleet: &SharedFleet) -> Seeded {
        let seeded = self.seeded();
        map.set_layer(Layer::Warehouses, self.warehouse_features());
        map.set_layer(Layer::Roads, self.road_features(&seeded.geo));

        let mut fleet = fleet.lock();
        for truck in &self.trucks {
            let Some(path) = seeded.geo.route_coords(&truck.origin, &truck.destination) else {
                log::warn!(
                    "[Scenario] Skipping truck {}: unknown route {} -> {}",
                    truck.id,
                    truck.origin,
                    truck.destination
                );
                continue;
            };
            if fleet.add(&truck.id, path) == TruckAdd::AtCapacity {
                log::warn!("[Scenario] Truck cap reached, dropping {}", truck.id);
            }
        }

        log::info!(
            "[Scenario] Seeded {} warehouse(s), {} corridor(s), {} truck(s)",
            self.warehouses.len(),
            seeded.geo.corridor_count(),
            fleet.len()
        );
        seeded
    }
}

/// Fetches the scenario document.
pub async fn fetch_scenario(client: &Client, url: &str) -> TwinResult<Scenario> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Scenario::from_json(&text)
}

/// Fetches the scenario if an endpoint is configured, falling back to the
/// offline seed on any failure.
pub async fn load_scenario(client: &Client, url: Option<&str>) -> Scenario {
    let Some(url) = url else {
        log::info!("[Scenario] No scenario endpoint configured, using offline seed");
        return Scenario::offline();
    };
    match fetch_scenario(client, url).await {
        Ok(scenario) => {
            log::info!("[Scenario] Loaded scenario from {}", url);
            scenario
        }
        Err(e) => {
            log::warn!("[Scenario] Falling back to offline seed: {}", e);
            Scenario::offline()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::RecordingMapAdapter;
    use crate::trucks::TruckFleet;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const DOC: &str = r#"{
        "warehouses": [
            {"name": "WH1", "lonlat": [77.2090, 28.6139]},
            {"name": "WH2", "lonlat": [72.8777, 19.0760]},
            {"name": "WH3", "lonlat": [80.2707, 13.0827]}
        ],
        "corridors": [
            {"path": ["WH1", "WH2"], "status": "congested"},
            {"path": [[72.8777, 19.0760], [76.0, 16.0], [80.2707, 13.0827]], "from": "WH2", "to": "WH3"},
            {"path": [[80.2707, 13.0827], [79.0, 21.0], [77.2090, 28.6139]], "status": "open"},
            {"path": [[70.0, 20.0], [71.0, 21.0]]}
        ],
        "dashboard": [
            {"name": "WH1", "inventory": 10, "inbound": 1, "outbound": 2},
            {"wh": "WH3", "inventory": 5}
        ],
        "trucks": [
            {"id": "T1", "origin": "WH2", "destination": "WH3"},
            {"id": "T2", "origin": "WH1", "destination": "WH9"}
        ]
    }"#;

    fn fleet() -> SharedFleet {
        Arc::new(Mutex::new(TruckFleet::new(60, 0.05)))
    }

    #[test]
    fn parses_both_corridor_path_forms() {
        let scenario = Scenario::from_json(DOC).unwrap();
        assert!(matches!(scenario.corridors[0].path, CorridorPath::Locations(_)));
        assert!(matches!(scenario.corridors[1].path, CorridorPath::Coords(_)));
        assert_eq!(scenario.corridors[1].status, "open");
        assert_eq!(scenario.dashboard[1].name, "WH3");
    }

    #[test]
    fn empty_scenario_is_rejected() {
        let err = Scenario::from_json(r#"{"warehouses": []}"#).unwrap_err();
        assert!(matches!(err, TwinError::Scenario(_)));
    }

    #[test]
    fn apply_seeds_geo_layers_stats_and_trucks() {
        let scenario = Scenario::from_json(DOC).unwrap();
        let map = RecordingMapAdapter::new();
        let fleet = fleet();

        let seeded = scenario.apply(&map, &fleet);

        assert_eq!(seeded.geo.corridor_count(), 3);
        assert_eq!(
            seeded.geo.route_coords("WH3", "WH2").unwrap().len(),
            3,
            "recorded corridor wins over the straight line"
        );
        assert_eq!(seeded.baseline["WH1"], StatRecord::new(10, 1, 2));
        assert_eq!(seeded.baseline["WH3"], StatRecord::new(5, 0, 0));
        assert_eq!(map.feature_count(Layer::Warehouses), 3);
        assert_eq!(map.feature_count(Layer::Roads), 4);

        let fleet = fleet.lock();
        assert_eq!(fleet.len(), 1);
        assert!(fleet.get("T1").is_some());
    }

    #[test]
    fn coordinate_corridor_endpoints_come_from_warehouses() {
        let seeded = Scenario::from_json(DOC).unwrap().seeded();

        let expected = vec![
            LngLat(80.2707, 13.0827),
            LngLat(79.0, 21.0),
            LngLat(77.2090, 28.6139),
        ];
        assert_eq!(seeded.geo.route_coords("WH1", "WH3"), Some(expected.clone()));
        assert_eq!(seeded.geo.route_coords("WH3", "WH1"), Some(expected));
    }

    #[test]
    fn coordinate_corridor_off_the_network_is_not_indexed() {
        let doc = r#"{
            "warehouses": [{"name": "WH1", "lonlat": [77.2090, 28.6139]}],
            "corridors": [{"path": [[77.2090, 28.6139], [71.0, 21.0]]}]
        }"#;
        let seeded = Scenario::from_json(doc).unwrap().seeded();
        assert_eq!(seeded.geo.corridor_count(), 0);
    }

    #[test]
    fn offline_seed_matches_demo_geography() {
        let seeded = Scenario::offline().seeded();
        let demo = GeoIndex::demo();
        for (a, b) in [("WH1", "WH4"), ("WH1", "WH2"), ("WH2", "WH4")] {
            assert_eq!(seeded.geo.route_coords(a, b), demo.route_coords(a, b));
        }
        assert_eq!(seeded.baseline.len(), 3);
    }

    #[tokio::test]
    async fn missing_endpoint_falls_back_to_offline_seed() {
        let client = Client::new();
        assert_eq!(load_scenario(&client, None).await, Scenario::offline());

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = format!("http://127.0.0.1:{port}/api/scenario");
        assert_eq!(load_scenario(&client, Some(&url)).await, Scenario::offline());
    }

    #[tokio::test]
    async fn fetches_scenario_from_backend() {
        use axum::routing::get;
        use axum::Router;

        let app = Router::new().route("/api/scenario", get(|| async { DOC }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{addr}/api/scenario");
        let scenario = load_scenario(&Client::new(), Some(&url)).await;
        assert_eq!(scenario.warehouses.len(), 3);
    }
}
