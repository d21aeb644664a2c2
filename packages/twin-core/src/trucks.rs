//! Live trucks and the animation loop that moves them.
//!
//! Trucks are created by `truck_add` events (and the scenario seed) and are
//! never removed by an event: each one loops over its route until the client
//! shuts down. The [`AnimationLoop`] advances every truck once per frame and
//! redraws the trucks layer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::geo::{LngLat, PathGeometry};
use crate::map::{Feature, FeatureCollection, Layer, MapAdapter};

/// A truck travelling along a fixed path.
#[derive(Debug, Clone)]
pub struct LiveTruck {
    pub id: String,
    pub path: PathGeometry,
    /// Position along the path as a fraction of its length, in `[0, 1)`.
    pub progress: f64,
    /// Fraction of the path covered per second.
    pub speed: f64,
    /// Cumulative arc length at each vertex.
    cumulative: Vec<f64>,
}

impl LiveTruck {
    /// Creates a truck at the start of `path`. Returns `None` for paths with
    /// fewer than two points.
    pub fn new(id: impl Into<String>, path: PathGeometry, speed: f64) -> Option<Self> {
        if path.len() < 2 {
            return None;
        }
        let mut cumulative = Vec::with_capacity(path.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in path.windows(2) {
            total += pair[0].planar_distance(&pair[1]);
            cumulative.push(total);
        }
        Some(Self {
            id: id.into(),
            path,
            progress: 0.0,
            speed,
            cumulative,
        })
    }

    /// Moves the truck forward by `dt`, wrapping to the start at the end.
    pub fn advance(&mut self, dt: Duration) {
        self.progress += self.speed * dt.as_secs_f64();
        if self.progress >= 1.0 || !self.progress.is_finite() {
            self.progress = 0.0;
        }
    }

    /// Interpolated position at the current progress.
    pub fn position(&self) -> LngLat {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        if total <= 0.0 {
            return self.path[0];
        }
        let target = self.progress * total;
        for (i, pair) in self.path.windows(2).enumerate() {
            let (start, end) = (self.cumulative[i], self.cumulative[i + 1]);
            if target <= end {
                let span = end - start;
                let t = if span > 0.0 { (target - start) / span } else { 0.0 };
                return pair[0].lerp(&pair[1], t);
            }
        }
        self.path[self.path.len() - 1]
    }
}

/// Result of adding a truck to the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruckAdd {
    Added,
    /// A truck with the same id existed; its route was replaced.
    Replaced,
    /// The fleet is full.
    AtCapacity,
    /// The route has fewer than two points.
    InvalidPath,
}

/// All live trucks, keyed by id.
#[derive(Debug)]
pub struct TruckFleet {
    trucks: BTreeMap<String, LiveTruck>,
    cap: usize,
    speed: f64,
}

impl TruckFleet {
    pub fn new(cap: usize, speed: f64) -> Self {
        Self {
            trucks: BTreeMap::new(),
            cap,
            speed,
        }
    }

    /// Adds a truck at the start of `path` with the fleet's default speed.
    pub fn add(&mut self, id: &str, path: PathGeometry) -> TruckAdd {
        let Some(truck) = LiveTruck::new(id, path, self.speed) else {
            return TruckAdd::InvalidPath;
        };
        let replacing = self.trucks.contains_key(id);
        if !replacing && self.trucks.len() >= self.cap {
            return TruckAdd::AtCapacity;
        }
        self.trucks.insert(id.to_string(), truck);
        if replacing {
            TruckAdd::Replaced
        } else {
            TruckAdd::Added
        }
    }

    pub fn get(&self, id: &str) -> Option<&LiveTruck> {
        self.trucks.get(id)
    }

    pub fn len(&self) -> usize {
        self.trucks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trucks.is_empty()
    }

    /// Advances every truck by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        for truck in self.trucks.values_mut() {
            truck.advance(dt);
        }
    }

    /// Interpolated position of every truck, ordered by id.
    pub fn positions(&self) -> Vec<(&str, LngLat)> {
        self.trucks
            .values()
            .map(|t| (t.id.as_str(), t.position()))
            .collect()
    }

    /// Point features for the trucks layer.
    pub fn features(&self) -> FeatureCollection {
        FeatureCollection::new(
            self.positions()
                .into_iter()
                .map(|(id, at)| Feature::point(at).with_property("id", id))
                .collect(),
        )
    }
}

/// Shared handle: the dispatcher adds trucks, the animation loop moves them.
pub type SharedFleet = Arc<Mutex<TruckFleet>>;

/// Per-frame animation driver.
pub struct AnimationLoop {
    fleet: SharedFleet,
    map: Arc<dyn MapAdapter>,
    frame: Duration,
}

impl AnimationLoop {
    pub fn new(fleet: SharedFleet, map: Arc<dyn MapAdapter>, frame: Duration) -> Self {
        Self { fleet, map, frame }
    }

    /// Runs until `cancel` fires.
    ///
    /// Frames with an empty fleet skip the redraw.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();

        log::debug!("[Trucks] Animation loop started ({:?} frames)", self.frame);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let now = Instant::now();
            let dt = now - last;
            last = now;

            let features = {
                let mut fleet = self.fleet.lock();
                if fleet.is_empty() {
                    continue;
                }
                fleet.advance(dt);
                fleet.features()
            };
            self.map.set_layer(Layer::Trucks, features);
        }
        log::debug!("[Trucks] Animation loop stopped");
    }
}
