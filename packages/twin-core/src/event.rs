//! Feed event envelope and typed payloads.
//!
//! Frames arrive as `{ "type": ..., "seq": ..., "payload": {...} }` plus a
//! few optional metadata fields. Decoding happens in two steps: the envelope
//! first (so the sequence number is known even when the payload is bad),
//! then the payload for the types the client understands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TwinError, TwinResult};
use crate::geo::LocationId;

/// Who produced an event on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Engine,
    Chat,
    Scenario,
    /// Any producer this client does not know about.
    #[serde(other)]
    Other,
}

/// Raw event as received from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Selects the handling branch.
    #[serde(rename = "type")]
    pub kind: String,
    /// Backend-assigned ordinal, used for duplicate suppression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Type-dependent payload.
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unix timestamp in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl EventEnvelope {
    /// Builds an envelope with only type, payload and optional seq.
    pub fn new(kind: impl Into<String>, seq: Option<u64>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            seq,
            payload,
            id: None,
            ts: None,
            source: None,
            version: None,
        }
    }

    /// Decodes one text frame.
    pub fn from_json(text: &str) -> TwinResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutePayload {
    pub a: LocationId,
    pub b: LocationId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReroutePayload {
    #[serde(default)]
    pub path: Vec<LocationId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InventoryDeltaPayload {
    pub wh: LocationId,
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TruckAddPayload {
    pub id: String,
    pub origin: LocationId,
    pub destination: LocationId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResultPayload {
    #[serde(default)]
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClarifyPayload {
    pub message: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FocusPayload {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// Events the dispatcher knows how to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum TwinEvent {
    Disruption(RoutePayload),
    Correct(RoutePayload),
    Reroute(ReroutePayload),
    InventoryDelta(InventoryDeltaPayload),
    TruckAdd(TruckAddPayload),
    QueryResult(QueryResultPayload),
    Clarify(ClarifyPayload),
    Focus(FocusPayload),
    Error(ErrorPayload),
}

impl TwinEvent {
    /// Decodes the payload of a known event type.
    ///
    /// Returns `Ok(None)` for types the client does not handle (they are
    /// ignored, not errors) and `Err` when a known type has a bad payload.
    pub fn decode(envelope: &EventEnvelope) -> TwinResult<Option<Self>> {
        fn payload<T: for<'de> Deserialize<'de>>(envelope: &EventEnvelope) -> TwinResult<T> {
            serde_json::from_value(envelope.payload.clone()).map_err(|e| {
                TwinError::Decode(format!("{} payload: {}", envelope.kind, e))
            })
        }

        let event = match envelope.kind.as_str() {
            "disruption" => Self::Disruption(payload(envelope)?),
            "correct" => Self::Correct(payload(envelope)?),
            "reroute" => Self::Reroute(payload(envelope)?),
            "inventory_delta" => Self::InventoryDelta(payload(envelope)?),
            "truck_add" => Self::TruckAdd(payload(envelope)?),
            "query_result" => Self::QueryResult(payload(envelope)?),
            "clarify" => Self::Clarify(payload(envelope)?),
            "focus" => Self::Focus(payload(envelope)?),
            "error" => Self::Error(payload(envelope)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
