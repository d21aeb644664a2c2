//! Predictive per-location counters.
//!
//! [`PredictiveStats`] is a derived display, not a source of truth: the
//! dispatcher nudges the counters as events arrive so the dashboard reacts
//! immediately, and `correct` events restore locations to the baseline.
//!
//! Every mutation derives a new table from the current one and swaps it in,
//! so a snapshot handed to the dashboard is never modified afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::LocationId;
use crate::utils::clamped_add;

/// Counters for one location. All values are clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatRecord {
    pub inventory: u64,
    pub inbound: u64,
    pub outbound: u64,
}

impl StatRecord {
    pub fn new(inventory: u64, inbound: u64, outbound: u64) -> Self {
        Self {
            inventory,
            inbound,
            outbound,
        }
    }
}

/// Snapshot of every location's counters, ordered by location id.
pub type StatsTable = BTreeMap<LocationId, StatRecord>;

/// Baseline plus live (predicted) counters.
#[derive(Debug, Clone, Default)]
pub struct PredictiveStats {
    baseline: Arc<StatsTable>,
    live: Arc<StatsTable>,
}

impl PredictiveStats {
    /// Creates stats whose live table starts equal to `baseline`.
    pub fn new(baseline: StatsTable) -> Self {
        let baseline = Arc::new(baseline);
        Self {
            live: Arc::clone(&baseline),
            baseline,
        }
    }

    /// Replaces the baseline and resets the live table to it.
    pub fn set_baseline(&mut self, baseline: StatsTable) {
        *self = Self::new(baseline);
    }

    /// Discards every prediction.
    pub fn reset_to_baseline(&mut self) {
        self.live = Arc::clone(&self.baseline);
    }

    pub fn get(&self, id: &str) -> Option<StatRecord> {
        self.live.get(id).copied()
    }

    pub fn baseline(&self, id: &str) -> Option<StatRecord> {
        self.baseline.get(id).copied()
    }

    /// Current live table. Cheap: shares the swapped-in allocation.
    pub fn snapshot(&self) -> Arc<StatsTable> {
        Arc::clone(&self.live)
    }

    /// Disruption penalty on route `origin` → `destination`.
    ///
    /// One unit of the origin's outbound flow is held back as inventory; the
    /// destination loses one inbound unit and one unit of inventory.
    pub fn apply_disruption(&mut self, origin: &str, destination: &str) {
        self.mutate(|table| {
            let src = table.entry(origin.to_string()).or_default();
            let moved = src.outbound.min(1);
            src.outbound -= moved;
            src.inventory += moved;

            let dst = table.entry(destination.to_string()).or_default();
            dst.inbound = dst.inbound.saturating_sub(1);
            dst.inventory = dst.inventory.saturating_sub(1);
        });
    }

    /// Restores the given locations to their baseline values.
    ///
    /// A location with no baseline row is removed from the live table.
    pub fn restore(&mut self, ids: &[&str]) {
        let baseline = Arc::clone(&self.baseline);
        self.mutate(|table| {
            for id in ids {
                match baseline.get(*id) {
                    Some(record) => {
                        table.insert((*id).to_string(), *record);
                    }
                    None => {
                        table.remove(*id);
                    }
                }
            }
        });
    }

    /// Detour adjustment along `path`.
    ///
    /// The origin gains one outbound unit, the destination one inbound unit,
    /// and every interior hop one unit of each (it both receives and
    /// forwards). Paths shorter than two hops are ignored.
    pub fn apply_reroute(&mut self, path: &[LocationId]) {
        if path.len() < 2 {
            return;
        }
        self.mutate(|table| {
            let last = path.len() - 1;
            for (i, id) in path.iter().enumerate() {
                let record = table.entry(id.clone()).or_default();
                if i < last {
                    record.outbound += 1;
                }
                if i > 0 {
                    record.inbound += 1;
                }
            }
        });
    }

    /// Adds `delta` (any sign) to `id`'s inventory, clamped at zero.
    pub fn apply_inventory_delta(&mut self, id: &str, delta: i64) {
        self.mutate(|table| {
            let record = table.entry(id.to_string()).or_default();
            record.inventory = clamped_add(record.inventory, delta);
        });
    }

    /// Copy, mutate, swap.
    fn mutate(&mut self, f: impl FnOnce(&mut StatsTable)) {
        let mut next = (*self.live).clone();
        f(&mut next);
        self.live = Arc::new(next);
    }
}
