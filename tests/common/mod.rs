#![allow(dead_code)]

use std::cell::RefCell;

use waymark::{
    geofence::{GeofenceConfig, GeofenceEngine},
    progress::{self, LocationProvider, Notification, NotificationSink, SampleInbox, TripStore},
    shared::{Coordinate, Duration, LocationSample, Timestamp},
    trip::{Stop, StopStatus},
};

pub const METERS_PER_DEGREE: f64 = 111_194.926_644_558_73;
pub const START: i64 = 1_700_000_000_000;

pub const FORBIDDEN_CITY: Coordinate = Coordinate::new(39.9163, 116.3972);
pub const JINGSHAN: Coordinate = Coordinate::new(39.9254, 116.3972);
pub const BEIHAI: Coordinate = Coordinate::new(39.9343, 116.3972);

pub fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(origin.latitude + meters / METERS_PER_DEGREE, origin.longitude)
}

pub fn south_of(origin: Coordinate, meters: f64) -> Coordinate {
    north_of(origin, -meters)
}

/// Sample `step` intervals of five seconds after `START`.
pub fn sample(coordinate: Coordinate, step: i64) -> LocationSample {
    LocationSample::new(coordinate, Timestamp::from_millis(START + step * 5_000))
}

pub fn engine() -> GeofenceEngine {
    GeofenceEngine::new(GeofenceConfig::default()).unwrap()
}

#[derive(Default)]
pub struct MockProvider {
    pub inbox: Option<SampleInbox>,
    pub deny: bool,
    pub subscribe_calls: usize,
    pub unsubscribe_calls: usize,
    pub interval: Option<Duration>,
}

impl MockProvider {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    /// Pushes into the inbox of the latest subscription.
    pub fn push(&self, sample: LocationSample) -> bool {
        self.inbox.as_ref().is_some_and(|inbox| inbox.push(sample))
    }
}

impl LocationProvider for MockProvider {
    fn subscribe(&mut self, inbox: SampleInbox, interval: Duration) -> Result<(), progress::Error> {
        self.subscribe_calls += 1;
        if self.deny {
            return Err(progress::Error::PermissionDenied);
        }
        self.inbox = Some(inbox);
        self.interval = Some(interval);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.unsubscribe_calls += 1;
    }
}

#[derive(Default)]
pub struct MockStore {
    pub stops: RefCell<Vec<Stop>>,
    pub writes: RefCell<Vec<(String, StopStatus)>>,
}

impl MockStore {
    pub fn new(stops: Vec<Stop>) -> Self {
        Self {
            stops: RefCell::new(stops),
            writes: RefCell::default(),
        }
    }

    /// Changes a stop behind the controller's back, as another device would.
    pub fn set_status(&self, stop_id: &str, status: StopStatus) {
        for stop in self.stops.borrow_mut().iter_mut() {
            if &*stop.id == stop_id {
                stop.status = status;
            }
        }
    }

    pub fn writes(&self) -> Vec<(String, StopStatus)> {
        self.writes.borrow().clone()
    }

    fn write(&self, stop_id: &str, status: StopStatus) {
        self.writes.borrow_mut().push((stop_id.to_string(), status));
        self.set_status(stop_id, status);
    }
}

impl TripStore for MockStore {
    fn list_stops(&self, _trip_id: &str) -> Result<Vec<Stop>, progress::Error> {
        Ok(self.stops.borrow().clone())
    }

    fn mark_arrived(&self, _trip_id: &str, stop_id: &str) {
        self.write(stop_id, StopStatus::Visiting);
    }

    fn mark_completed(&self, _trip_id: &str, stop_id: &str) {
        self.write(stop_id, StopStatus::Completed);
    }

    fn mark_skipped(&self, _trip_id: &str, stop_id: &str) {
        self.write(stop_id, StopStatus::Skipped);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<Notification>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Notification> {
        self.events.borrow().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.events.borrow_mut().push(notification);
    }
}
