use std::sync::Mutex;

use tracing::{info, warn};
use waymark::{
    progress::{self, Notification, NotificationSink, TripStore},
    trip::{Stop, StopStatus},
};

/// Keeps the trip in memory in place of the real backend.
pub struct MemoryStore {
    stops: Mutex<Vec<Stop>>,
}

impl MemoryStore {
    pub fn new(stops: Vec<Stop>) -> Self {
        Self {
            stops: Mutex::new(stops),
        }
    }

    pub fn stops(&self) -> Vec<Stop> {
        self.stops
            .lock()
            .map(|stops| stops.clone())
            .unwrap_or_default()
    }

    fn set_status(&self, trip_id: &str, stop_id: &str, status: StopStatus) {
        let Ok(mut stops) = self.stops.lock() else {
            warn!(trip = trip_id, stop = stop_id, "store lock poisoned, dropping write");
            return;
        };
        match stops.iter_mut().find(|stop| &*stop.id == stop_id) {
            Some(stop) => {
                stop.status = status;
                info!(trip = trip_id, stop = stop_id, %status, "stop status persisted");
            }
            None => warn!(trip = trip_id, stop = stop_id, "unknown stop"),
        }
    }
}

impl TripStore for MemoryStore {
    fn list_stops(&self, _trip_id: &str) -> Result<Vec<Stop>, progress::Error> {
        self.stops
            .lock()
            .map(|stops| stops.clone())
            .map_err(|err| progress::Error::Store(err.to_string()))
    }

    fn mark_arrived(&self, trip_id: &str, stop_id: &str) {
        self.set_status(trip_id, stop_id, StopStatus::Visiting);
    }

    fn mark_completed(&self, trip_id: &str, stop_id: &str) {
        self.set_status(trip_id, stop_id, StopStatus::Completed);
    }

    fn mark_skipped(&self, trip_id: &str, stop_id: &str) {
        self.set_status(trip_id, stop_id, StopStatus::Skipped);
    }
}

/// Writes every notification to stdout as one JSON line.
pub struct JsonLineSink;

impl NotificationSink for JsonLineSink {
    fn notify(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(%err, "could not encode notification"),
        }
    }
}
