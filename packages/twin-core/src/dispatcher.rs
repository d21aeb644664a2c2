//! Event dispatcher: applies feed events to the map, stats and notifications.
//!
//! The dispatcher is owned by a single task (the connection manager), which
//! serializes every access to the sequence cursor and the stats table.
//! `dispatch` never fails: duplicates are dropped, unknown types ignored and
//! malformed payloads logged.

use std::sync::Arc;

use serde_json::Value;

use crate::event::{
    ClarifyPayload, EventEnvelope, FocusPayload, InventoryDeltaPayload, QueryResultPayload,
    ReroutePayload, RoutePayload, TruckAddPayload, TwinEvent,
};
use crate::geo::GeoIndex;
use crate::map::{FeatureCollection, Layer, MapAdapter};
use crate::notify::{Notification, NotificationSink, Speaker};
use crate::session::Session;
use crate::stats::PredictiveStats;
use crate::trucks::{SharedFleet, TruckAdd};

/// What `dispatch` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A recognized event was applied.
    Applied,
    /// `seq` was not newer than the cursor; nothing happened.
    Duplicate,
    /// Unknown type; nothing happened.
    Ignored,
    /// Known type with an undecodable payload; nothing happened.
    Malformed,
}

/// Highest sequence number applied so far.
///
/// Events without `seq` always pass; events with `seq <= cursor` never do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCursor {
    last: Option<u64>,
}

impl SequenceCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Whether `seq` would be rejected as already seen.
    pub fn is_behind(&self, seq: u64) -> bool {
        self.last.is_some_and(|last| seq <= last)
    }

    /// Returns whether an event with `seq` should be applied, advancing the
    /// cursor when it is.
    pub fn admit(&mut self, seq: Option<u64>) -> bool {
        match (seq, self.last) {
            (None, _) => true,
            (Some(seq), Some(last)) if seq <= last => false,
            (Some(seq), _) => {
                self.last = Some(seq);
                true
            }
        }
    }
}

/// Routes decoded events to their side effects.
pub struct EventDispatcher {
    geo: Arc<GeoIndex>,
    map: Arc<dyn MapAdapter>,
    sink: Arc<dyn NotificationSink>,
    speaker: Arc<dyn Speaker>,
    session: Arc<Session>,
    stats: Option<PredictiveStats>,
    fleet: Option<SharedFleet>,
    cursor: SequenceCursor,
}

impl EventDispatcher {
    pub fn new(
        geo: Arc<GeoIndex>,
        map: Arc<dyn MapAdapter>,
        sink: Arc<dyn NotificationSink>,
        speaker: Arc<dyn Speaker>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            geo,
            map,
            sink,
            speaker,
            session,
            stats: None,
            fleet: None,
            cursor: SequenceCursor::new(),
        }
    }

    /// Enables predictive stats.
    #[must_use]
    pub fn with_stats(mut self, stats: PredictiveStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Enables live trucks.
    #[must_use]
    pub fn with_fleet(mut self, fleet: SharedFleet) -> Self {
        self.fleet = Some(fleet);
        self
    }

    pub fn cursor(&self) -> SequenceCursor {
        self.cursor
    }

    pub fn stats(&self) -> Option<&PredictiveStats> {
        self.stats.as_ref()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Applies one event.
    pub fn dispatch(&mut self, envelope: &EventEnvelope) -> DispatchOutcome {
        if !self.cursor.admit(envelope.seq) {
            log::debug!(
                "[Dispatch] Dropping stale {} (seq {:?} <= cursor {:?})",
                envelope.kind,
                envelope.seq,
                self.cursor.last()
            );
            return DispatchOutcome::Duplicate;
        }

        match TwinEvent::decode(envelope) {
            Ok(Some(event)) => {
                log::debug!("[Dispatch] {} (seq {:?})", envelope.kind, envelope.seq);
                self.apply(event);
                DispatchOutcome::Applied
            }
            Ok(None) => {
                log::trace!("[Dispatch] Ignoring event type {:?}", envelope.kind);
                DispatchOutcome::Ignored
            }
            Err(e) => {
                log::warn!("[Dispatch] Dropping malformed event: {}", e);
                DispatchOutcome::Malformed
            }
        }
    }

    /// Discards predictions and redraws the dashboard. Called when the feed
    /// (re)opens, since the backend state may have moved on meanwhile.
    pub fn reset_stats(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.reset_to_baseline();
        }
        self.render_stats();
    }

    fn apply(&mut self, event: TwinEvent) {
        match event {
            TwinEvent::Disruption(p) => self.on_disruption(p),
            TwinEvent::Correct(p) => self.on_correct(p),
            TwinEvent::Reroute(p) => self.on_reroute(p),
            TwinEvent::InventoryDelta(p) => self.on_inventory_delta(p),
            TwinEvent::TruckAdd(p) => self.on_truck_add(p),
            TwinEvent::QueryResult(p) => self.on_query_result(p),
            TwinEvent::Clarify(p) => self.on_clarify(p),
            TwinEvent::Focus(p) => self.on_focus(p),
            TwinEvent::Error(p) => {
                self.sink
                    .notify(Notification::log(format!("Backend error: {}", p.message)));
            }
        }
    }

    fn on_disruption(&mut self, RoutePayload { a, b }: RoutePayload) {
        let alert = match self.geo.route_coords(&a, &b) {
            Some(path) => FeatureCollection::lines([path]),
            None => {
                log::warn!("[Dispatch] No geometry for disrupted route {} - {}", a, b);
                FeatureCollection::empty()
            }
        };
        self.map.set_layer(Layer::Alert, alert);
        self.map.clear_layer(Layer::Fix);

        if self.session.auto_zoom_on() {
            self.fit_to(&[a.as_str(), b.as_str()]);
        }

        if let Some(stats) = self.stats.as_mut() {
            stats.apply_disruption(&a, &b);
            self.render_stats();
        }

        self.sink
            .notify(Notification::chat(format!("Disruption on {a} → {b}")));
        self.speak(&format!("Disruption on {a} to {b}"));
    }

    fn on_correct(&mut self, RoutePayload { a, b }: RoutePayload) {
        self.map.clear_layer(Layer::Alert);
        self.map.clear_layer(Layer::Fix);

        if let Some(stats) = self.stats.as_mut() {
            stats.restore(&[a.as_str(), b.as_str()]);
            self.render_stats();
        }

        self.sink
            .notify(Notification::chat(format!("Correction applied on {a} → {b}")));
        self.speak(&format!("Correction applied on {a} to {b}"));
    }

    fn on_reroute(&mut self, ReroutePayload { path }: ReroutePayload) {
        let edges = self.geo.path_edges(&path);
        self.map.set_layer(Layer::Fix, FeatureCollection::lines(edges));
        self.fit_to(&path.iter().map(String::as_str).collect::<Vec<_>>());

        if let Some(stats) = self.stats.as_mut() {
            stats.apply_reroute(&path);
            self.render_stats();
        }

        self.sink
            .notify(Notification::chat(format!("Detour via {}", path.join(" → "))));
        self.speak(&format!("Detour via {}", path.join(" to ")));
    }

    fn on_inventory_delta(&mut self, p: InventoryDeltaPayload) {
        if let Some(stats) = self.stats.as_mut() {
            stats.apply_inventory_delta(&p.wh, p.delta);
            self.render_stats();
        }

        let mut text = format!("Inventory {} {:+}", p.wh, p.delta);
        if let Some(reason) = p.reason.filter(|r| !r.is_empty()) {
            text.push_str(&format!(" ({reason})"));
        }
        self.sink.notify(Notification::chat(text));
    }

    fn on_truck_add(&mut self, p: TruckAddPayload) {
        let text = match (self.geo.route_coords(&p.origin, &p.destination), &self.fleet) {
            (Some(path), Some(fleet)) => match fleet.lock().add(&p.id, path) {
                TruckAdd::Added | TruckAdd::Replaced => {
                    format!("Truck {} en route {} → {}", p.id, p.origin, p.destination)
                }
                TruckAdd::AtCapacity => {
                    log::warn!("[Dispatch] Fleet full, truck {} not shown", p.id);
                    format!("Truck {} not shown (fleet full)", p.id)
                }
                TruckAdd::InvalidPath => format!("Truck {} has no drawable route", p.id),
            },
            (Some(_), None) => format!("Truck {} en route {} → {}", p.id, p.origin, p.destination),
            (None, _) => {
                log::warn!(
                    "[Dispatch] No route for truck {} ({} -> {})",
                    p.id,
                    p.origin,
                    p.destination
                );
                format!(
                    "Truck {} has no known route {} → {}",
                    p.id, p.origin, p.destination
                )
            }
        };
        self.sink.notify(Notification::chat(text));
    }

    fn on_query_result(&mut self, QueryResultPayload { answer }: QueryResultPayload) {
        let text = match answer {
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.sink.notify(Notification::chat(text));
        self.speak("Here is the answer");
    }

    fn on_clarify(&mut self, ClarifyPayload { message, options }: ClarifyPayload) {
        self.sink
            .notify(Notification::chat_with_options(message, options));
    }

    fn on_focus(&mut self, FocusPayload { target }: FocusPayload) {
        let text = match self.geo.coord(&target) {
            Some(coord) => {
                self.map.fit_view(&[coord]);
                format!("Focus on {target}")
            }
            None => format!("Unknown location {target}"),
        };
        self.sink.notify(Notification::chat(text));
    }

    fn fit_to(&self, ids: &[&str]) {
        let points = self.geo.coords_of(ids.iter().copied());
        if !points.is_empty() {
            self.map.fit_view(&points);
        }
    }

    fn render_stats(&self) {
        if let Some(stats) = &self.stats {
            self.sink.render_dashboard(stats.snapshot());
        }
    }

    fn speak(&self, text: &str) {
        if self.session.voice_on() {
            self.speaker.speak(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Geometry, RecordingMapAdapter};
    use crate::notify::{RecordingNotificationSink, RecordingSpeaker};
    use crate::stats::{StatRecord, StatsTable};
    use crate::trucks::TruckFleet;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Harness {
        dispatcher: EventDispatcher,
        map: Arc<RecordingMapAdapter>,
        sink: Arc<RecordingNotificationSink>,
        speaker: Arc<RecordingSpeaker>,
        session: Arc<Session>,
        fleet: SharedFleet,
    }

    fn harness() -> Harness {
        let map = Arc::new(RecordingMapAdapter::new());
        let sink = Arc::new(RecordingNotificationSink::new());
        let speaker = Arc::new(RecordingSpeaker::new());
        let session = Arc::new(Session::new(true, true));
        let fleet: SharedFleet = Arc::new(Mutex::new(TruckFleet::new(10, 0.1)));

        let mut baseline = StatsTable::new();
        baseline.insert("WH1".into(), StatRecord::new(120, 4, 6));
        baseline.insert("WH2".into(), StatRecord::new(80, 3, 2));
        baseline.insert("WH4".into(), StatRecord::new(60, 5, 1));

        let dispatcher = EventDispatcher::new(
            Arc::new(GeoIndex::demo()),
            map.clone(),
            sink.clone(),
            speaker.clone(),
            session.clone(),
        )
        .with_stats(PredictiveStats::new(baseline))
        .with_fleet(fleet.clone());

        Harness {
            dispatcher,
            map,
            sink,
            speaker,
            session,
            fleet,
        }
    }

    fn event(kind: &str, seq: Option<u64>, payload: Value) -> EventEnvelope {
        EventEnvelope::new(kind, seq, payload)
    }

    #[test]
    fn cursor_admits_only_newer_sequences() {
        let mut cursor = SequenceCursor::new();
        assert!(cursor.admit(Some(0)));
        assert!(cursor.admit(Some(5)));
        assert!(!cursor.admit(Some(5)));
        assert!(!cursor.admit(Some(3)));
        assert!(cursor.admit(None));
        assert_eq!(cursor.last(), Some(5));
        assert!(cursor.admit(Some(9)));
        assert_eq!(cursor.last(), Some(9));
        assert!(cursor.is_behind(1));
        assert!(cursor.is_behind(9));
        assert!(!cursor.is_behind(10));
        assert!(!SequenceCursor::new().is_behind(0));
    }

    #[test]
    fn disruption_draws_alert_and_clears_fix() {
        let mut h = harness();
        let outcome = h
            .dispatcher
            .dispatch(&event("disruption", None, json!({"a": "WH1", "b": "WH4"})));

        assert_eq!(outcome, DispatchOutcome::Applied);
        let alert = h.map.layer(Layer::Alert).unwrap();
        assert_eq!(alert.len(), 1);
        assert_eq!(
            alert.features[0].geometry,
            Geometry::LineString {
                coordinates: GeoIndex::demo().route_coords("WH1", "WH4").unwrap()
            }
        );
        assert_eq!(h.map.layer(Layer::Fix), Some(FeatureCollection::empty()));
        assert_eq!(h.map.fit_requests().len(), 1);
        assert_eq!(h.sink.notification_count(), 1);
        assert_eq!(h.speaker.spoken(), vec!["Disruption on WH1 to WH4"]);
        assert_eq!(h.dispatcher.cursor().last(), None);
    }

    #[test]
    fn disruption_from_unfamiliar_source_is_applied() {
        let mut h = harness();
        let text = r#"{"type":"disruption","seq":3,"source":"operator","payload":{"a":"WH1","b":"WH4"}}"#;
        let envelope = EventEnvelope::from_json(text).unwrap();

        assert_eq!(h.dispatcher.dispatch(&envelope), DispatchOutcome::Applied);
        assert_eq!(h.map.feature_count(Layer::Alert), 1);
        assert_eq!(h.dispatcher.cursor().last(), Some(3));
    }

    #[test]
    fn disruption_applies_predictive_penalty() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("disruption", Some(1), json!({"a": "WH1", "b": "WH4"})));

        let stats = h.dispatcher.stats().unwrap();
        assert_eq!(stats.get("WH1"), Some(StatRecord::new(121, 4, 5)));
        assert_eq!(stats.get("WH4"), Some(StatRecord::new(59, 4, 1)));
        assert_eq!(h.sink.dashboard_renders(), 1);
        assert_eq!(h.dispatcher.cursor().last(), Some(1));
    }

    #[test]
    fn disruption_respects_auto_zoom_flag() {
        let mut h = harness();
        h.session.set_auto_zoom(false);
        h.dispatcher
            .dispatch(&event("disruption", None, json!({"a": "WH1", "b": "WH4"})));
        assert!(h.map.fit_requests().is_empty());
    }

    #[test]
    fn duplicate_sequence_has_no_side_effects() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("inventory_delta", Some(5), json!({"wh": "WH2", "delta": 1})));
        let updates = h.map.updates().len();
        let notifications = h.sink.notification_count();
        let renders = h.sink.dashboard_renders();

        let outcome = h
            .dispatcher
            .dispatch(&event("disruption", Some(5), json!({"a": "WH1", "b": "WH2"})));

        assert_eq!(outcome, DispatchOutcome::Duplicate);
        assert_eq!(h.map.updates().len(), updates);
        assert_eq!(h.sink.notification_count(), notifications);
        assert_eq!(h.sink.dashboard_renders(), renders);
        assert!(h.speaker.spoken().is_empty());
        assert_eq!(h.dispatcher.cursor().last(), Some(5));
    }

    #[test]
    fn events_without_seq_always_apply() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("focus", Some(100), json!({"target": "WH4"})));
        for _ in 0..3 {
            let outcome = h
                .dispatcher
                .dispatch(&event("focus", None, json!({"target": "WH4"})));
            assert_eq!(outcome, DispatchOutcome::Applied);
        }
        assert_eq!(h.sink.notification_count(), 4);
        assert_eq!(h.dispatcher.cursor().last(), Some(100));
    }

    #[test]
    fn reroute_renders_one_segment_per_hop() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "reroute",
            None,
            json!({"path": ["WH1", "WH2", "WH4"], "scope": "paused"}),
        ));

        assert_eq!(h.map.feature_count(Layer::Fix), 2);
        let fits = h.map.fit_requests();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].len(), 3);
        assert_eq!(h.sink.last_text().as_deref(), Some("Detour via WH1 → WH2 → WH4"));
        assert_eq!(h.speaker.spoken(), vec!["Detour via WH1 to WH2 to WH4"]);

        let stats = h.dispatcher.stats().unwrap();
        assert_eq!(stats.get("WH1").unwrap().outbound, 7);
        assert_eq!(stats.get("WH2"), Some(StatRecord::new(80, 4, 3)));
        assert_eq!(stats.get("WH4").unwrap().inbound, 6);
    }

    #[test]
    fn correct_restores_baseline_and_clears_overlays() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("disruption", None, json!({"a": "WH1", "b": "WH4"})));
        h.dispatcher
            .dispatch(&event("reroute", None, json!({"path": ["WH1", "WH2", "WH4"]})));
        h.dispatcher.dispatch(&event(
            "inventory_delta",
            None,
            json!({"wh": "WH1", "delta": -500}),
        ));

        h.dispatcher
            .dispatch(&event("correct", None, json!({"a": "WH1", "b": "WH4"})));

        let stats = h.dispatcher.stats().unwrap();
        assert_eq!(stats.get("WH1"), stats.baseline("WH1"));
        assert_eq!(stats.get("WH4"), stats.baseline("WH4"));
        assert_eq!(h.map.layer(Layer::Alert), Some(FeatureCollection::empty()));
        assert_eq!(h.map.layer(Layer::Fix), Some(FeatureCollection::empty()));
    }

    #[test]
    fn inventory_delta_clamps_at_zero() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "inventory_delta",
            None,
            json!({"wh": "WH2", "delta": -1000, "reason": "pulse"}),
        ));
        assert_eq!(h.dispatcher.stats().unwrap().get("WH2").unwrap().inventory, 0);
        assert_eq!(h.sink.last_text().as_deref(), Some("Inventory WH2 -1000 (pulse)"));
        assert!(h.speaker.spoken().is_empty());
    }

    #[test]
    fn truck_add_puts_truck_on_route() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "truck_add",
            None,
            json!({"id": "T42", "origin": "WH2", "destination": "WH4"}),
        ));
        let fleet = h.fleet.lock();
        let truck = fleet.get("T42").unwrap();
        assert_eq!(truck.path, GeoIndex::demo().route_coords("WH2", "WH4").unwrap());
        assert_eq!(h.sink.notification_count(), 1);
    }

    #[test]
    fn truck_add_with_unknown_location_only_notifies() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "truck_add",
            None,
            json!({"id": "T7", "origin": "WH2", "destination": "WH9"}),
        ));
        assert!(h.fleet.lock().is_empty());
        assert_eq!(h.sink.notification_count(), 1);
    }

    #[test]
    fn query_result_stringifies_non_string_answers() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "query_result",
            None,
            json!({"kind": "status", "answer": {"delayed": 3}}),
        ));
        assert_eq!(h.sink.last_text().as_deref(), Some(r#"{"delayed":3}"#));
        assert_eq!(h.speaker.spoken().len(), 1);
    }

    #[test]
    fn clarify_carries_options() {
        let mut h = harness();
        h.dispatcher.dispatch(&event(
            "clarify",
            None,
            json!({"message": "Which one?", "options": ["Fix", "Reroute"]}),
        ));
        let notifications = h.sink.notifications();
        assert_eq!(notifications[0].options(), ["Fix".to_string(), "Reroute".to_string()]);
    }

    #[test]
    fn focus_on_unknown_target_does_not_move_view() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("focus", None, json!({"target": "Atlantis"})));
        assert!(h.map.fit_requests().is_empty());
        assert_eq!(h.sink.notification_count(), 1);
    }

    #[test]
    fn unknown_and_malformed_events_do_nothing() {
        let mut h = harness();
        assert_eq!(
            h.dispatcher.dispatch(&event("tick", Some(1), json!({}))),
            DispatchOutcome::Ignored
        );
        assert_eq!(
            h.dispatcher
                .dispatch(&event("disruption", Some(2), json!({"a": "WH1"}))),
            DispatchOutcome::Malformed
        );
        assert!(h.map.updates().is_empty());
        assert_eq!(h.sink.notification_count(), 0);
        assert_eq!(h.dispatcher.cursor().last(), Some(2));
    }

    #[test]
    fn voice_off_silences_speech() {
        let mut h = harness();
        h.session.set_voice(false);
        h.dispatcher
            .dispatch(&event("disruption", None, json!({"a": "WH1", "b": "WH4"})));
        assert!(h.speaker.spoken().is_empty());
        assert_eq!(h.sink.notification_count(), 1);
    }

    #[test]
    fn backend_error_is_surfaced() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("error", None, json!({"message": "Empty command"})));
        assert_eq!(
            h.sink.last_text().as_deref(),
            Some("Backend error: Empty command")
        );
    }

    #[test]
    fn reset_stats_rerenders_baseline() {
        let mut h = harness();
        h.dispatcher
            .dispatch(&event("inventory_delta", None, json!({"wh": "WH1", "delta": 9})));
        h.dispatcher.reset_stats();
        let table = h.sink.last_dashboard().unwrap();
        assert_eq!(table.get("WH1"), Some(&StatRecord::new(120, 4, 6)));
    }
}
