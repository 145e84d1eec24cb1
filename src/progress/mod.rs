mod controller;
mod inbox;

pub use controller::*;
pub use inbox::*;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{
    geofence::Transition,
    shared::{Coordinate, Distance, Duration, Timestamp},
    trip::Stop,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Location permission was denied")]
    PermissionDenied,
    #[error("Location provider failed: {0}")]
    Provider(String),
    #[error("Trip store failed: {0}")]
    Store(String),
    #[error("Sample {0} is not a finite coordinate")]
    MalformedSample(Coordinate),
}

/// Source of location samples.
pub trait LocationProvider {
    /// Starts delivering samples into `inbox`, nominally every `interval`.
    /// Permission problems are reported here; the controller then stays idle.
    fn subscribe(&mut self, inbox: SampleInbox, interval: Duration) -> Result<(), self::Error>;

    fn unsubscribe(&mut self);
}

/// Persistence for stop status. Writes are fire and forget: implementations
/// queue or retry on their own and never block the sample loop.
pub trait TripStore {
    fn list_stops(&self, trip_id: &str) -> Result<Vec<Stop>, self::Error>;
    fn mark_arrived(&self, trip_id: &str, stop_id: &str);
    fn mark_completed(&self, trip_id: &str, stop_id: &str);
    fn mark_skipped(&self, trip_id: &str, stop_id: &str);
}

pub trait NotificationSink {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification),
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Transition {
        stop_id: Arc<str>,
        kind: Transition,
        timestamp: Timestamp,
    },
    RouteOptimized {
        order: Vec<Arc<str>>,
        length: Distance,
    },
    TripFinished {
        timestamp: Timestamp,
    },
}

/// Which confirmation threshold the controller hands to the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitMode {
    #[default]
    Normal,
    /// Reduced threshold for demos and field testing.
    Accelerated,
}
