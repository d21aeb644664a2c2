//! Twin Core - shared library for the Agentic Twin client.
//!
//! This crate is the client half of a logistics "digital twin": it follows
//! the backend's live event feed, draws disruptions and detours on a map,
//! keeps a predictive inventory dashboard and relays free-text commands.
//! It is used by the headless terminal client and can back any front-end
//! that implements the adapter traits.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`connection`]: Live feed connection with fixed-delay reconnect
//! - [`dispatcher`]: Applies feed events to map, stats and notifications
//! - [`event`]: Event envelope and typed payloads
//! - [`geo`]: Locations, corridors and route geometry
//! - [`stats`]: Predictive (non-authoritative) dashboard stats
//! - [`trucks`]: Live trucks and the animation loop
//! - [`scenario`]: Scenario bootstrap and the offline seed
//! - [`command`]: Free-text command submission
//! - [`health`]: Health check and keep-alive
//! - [`config`]: Client configuration and URL building
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! Core logic is decoupled from the front-end through:
//!
//! - [`MapAdapter`](map::MapAdapter): Layer updates and view fitting
//! - [`NotificationSink`](notify::NotificationSink): Log/chat panel and dashboard
//! - [`Speaker`](notify::Speaker): Spoken notifications
//! - [`FeedTransport`](connection::FeedTransport): Opening the event feed
//!
//! Each trait has no-op, logging and in-memory recording implementations.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod geo;
pub mod health;
pub mod map;
pub mod notify;
pub mod protocol_constants;
pub mod scenario;
pub mod session;
pub mod stats;
pub mod trucks;
pub mod utils;

// Re-export commonly used types at the crate root
pub use command::{CommandOutcome, CommandSender};
pub use config::{ClientConfig, HealthCheckConfig, UrlBuilder};
pub use connection::{ConnectionManager, ConnectionState, FeedStream, FeedTransport, WsTransport};
pub use dispatcher::{DispatchOutcome, EventDispatcher, SequenceCursor};
pub use error::{ErrorCode, TwinError, TwinResult};
pub use event::{EventEnvelope, TwinEvent};
pub use geo::{GeoIndex, LngLat, LocationId, PathGeometry};
pub use health::{HealthCheck, HttpHealthCheck, KeepAlive};
pub use map::{Feature, FeatureCollection, Geometry, Layer, MapAdapter};
pub use notify::{
    BroadcastEvent, BroadcastNotificationBridge, Notification, NotificationSink, Speaker,
};
pub use scenario::Scenario;
pub use session::Session;
pub use stats::{PredictiveStats, StatRecord, StatsTable};
pub use trucks::{LiveTruck, SharedFleet, TruckFleet};
pub use utils::now_millis;

// Re-export bootstrap types
pub use bootstrap::{bootstrap_client, bootstrap_client_with_transport, ClientAdapters, TwinClient};
