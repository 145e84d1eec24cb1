use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    geofence::{
        FenceStatus, GeofenceEngine, GeofenceState, Transition,
        target::{first_unfinished, nearest_unfinished},
    },
    progress::{
        Error, HitMode, LocationProvider, Notification, NotificationSink, SampleInbox, TripStore,
    },
    route::{RouteOptimizer, apply_order, route_length},
    shared::{Coordinate, Distance, Locatable, LocationSample, Timestamp},
    trip::{Stop, StopStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitoring {
    Started,
    AlreadyRunning,
    /// Nothing left to visit, no subscription was made.
    Idle,
}

#[derive(Debug, Clone, Copy)]
enum Seed {
    FirstUnfinished,
    NearestTo(Coordinate),
}

/// Read only view of the controller for display and debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub monitoring: bool,
    pub mode: HitMode,
    pub target: Option<Arc<str>>,
    pub last_status: Option<FenceStatus>,
    pub arrive_hits: u32,
    pub leave_hits: u32,
    pub last_distance: Option<Distance>,
}

/// Drives a trip forward from location samples.
///
/// Holds the active stop sequence, the single geofence target and the provider
/// subscription. All state changes go through `&mut self`, so samples are
/// handled one at a time in the order they are delivered.
pub struct TripProgressController<P, S, N> {
    trip_id: Arc<str>,
    engine: GeofenceEngine,
    optimizer: RouteOptimizer,
    provider: P,
    store: S,
    sink: N,
    stops: Vec<Stop>,
    mode: HitMode,
    inbox: Option<SampleInbox>,
    fence: Option<GeofenceState>,
}

impl<P, S, N> TripProgressController<P, S, N>
where
    P: LocationProvider,
    S: TripStore,
    N: NotificationSink,
{
    pub fn new(
        trip_id: impl Into<Arc<str>>,
        engine: GeofenceEngine,
        provider: P,
        store: S,
        sink: N,
    ) -> Self {
        let optimizer = RouteOptimizer::new(engine.config().region);
        Self {
            trip_id: trip_id.into(),
            engine,
            optimizer,
            provider,
            store,
            sink,
            stops: Vec::new(),
            mode: HitMode::default(),
            inbox: None,
            fence: None,
        }
    }

    pub fn with_mode(mut self, mode: HitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_mode(&mut self, mode: HitMode) {
        info!(?mode, "hit mode changed");
        self.mode = mode;
    }

    pub fn mode(&self) -> HitMode {
        self.mode
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn target(&self) -> Option<&Stop> {
        self.fence.as_ref().map(GeofenceState::target)
    }

    pub fn is_monitoring(&self) -> bool {
        self.inbox.is_some()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn snapshot(&self) -> Snapshot {
        let fence = self.fence.as_ref();
        Snapshot {
            monitoring: self.is_monitoring(),
            mode: self.mode,
            target: fence.map(|state| state.target().id.clone()),
            last_status: fence.map(GeofenceState::last_status),
            arrive_hits: fence.map(GeofenceState::arrive_hits).unwrap_or_default(),
            leave_hits: fence.map(GeofenceState::leave_hits).unwrap_or_default(),
            last_distance: fence.and_then(GeofenceState::last_distance),
        }
    }

    /// Pulls the stop list from the store and makes it the active sequence.
    ///
    /// With a `saved_order` the stored order is re-applied, otherwise the list
    /// is optimized from `user_position`. Store state overrides anything this
    /// controller assumed locally.
    pub fn load<O>(
        &mut self,
        user_position: Option<Coordinate>,
        saved_order: Option<&[O]>,
    ) -> Result<&[Stop], Error>
    where
        O: AsRef<str>,
    {
        let stops = self.store.list_stops(&self.trip_id)?;
        let mut stops = match saved_order {
            Some(order) => apply_order(stops, order),
            None => self.optimizer.optimize(stops, user_position),
        };
        // The active sequence is the visiting order, not the planned one
        for (position, stop) in stops.iter_mut().enumerate() {
            stop.sequence = u32::try_from(position)
                .unwrap_or(u32::MAX)
                .saturating_add(1);
        }
        info!(trip = %self.trip_id, stops = stops.len(), "loaded trip");

        self.sink.notify(Notification::RouteOptimized {
            order: stops.iter().map(|stop| stop.id.clone()).collect(),
            length: route_length(&stops),
        });
        self.stops = stops;
        self.reconcile_target();
        Ok(&self.stops)
    }

    /// Begins monitoring. Calling it while already monitoring does nothing.
    pub fn start(&mut self) -> Result<Monitoring, Error> {
        if self.inbox.is_some() {
            debug!("monitoring already running");
            return Ok(Monitoring::AlreadyRunning);
        }
        if !self.select_target(Seed::FirstUnfinished) {
            info!(trip = %self.trip_id, "no routable target, staying idle");
            return Ok(Monitoring::Idle);
        }

        let inbox = SampleInbox::new();
        let interval = self.engine.config().sample_interval;
        if let Err(err) = self.provider.subscribe(inbox.clone(), interval) {
            warn!(%err, "location subscription failed");
            inbox.close();
            self.fence = None;
            return Err(err);
        }
        info!(trip = %self.trip_id, "monitoring started");
        self.inbox = Some(inbox);
        Ok(Monitoring::Started)
    }

    /// Stops monitoring and forgets all geofence state. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(inbox) = self.inbox.take() {
            self.provider.unsubscribe();
            inbox.close();
            info!(trip = %self.trip_id, "monitoring stopped");
        }
        self.fence = None;
    }

    /// Handles every queued sample in arrival order. Returns how many were taken.
    pub fn pump(&mut self) -> usize {
        let Some(inbox) = self.inbox.clone() else {
            return 0;
        };
        let mut handled = 0;
        while self.inbox.is_some()
            && let Some(sample) = inbox.pop()
        {
            self.process(sample);
            handled += 1;
        }
        handled
    }

    /// Synchronous entry point for a single sample. Ignored unless monitoring.
    pub fn on_sample(&mut self, sample: LocationSample) -> Option<Transition> {
        if self.inbox.is_none() {
            debug!("not monitoring, dropping sample");
            return None;
        }
        self.process(sample)
    }

    /// Treats `sample` as a position forced by a test harness: the target is
    /// re-seeded with the unfinished stop nearest to it, then the sample is
    /// processed. Works with or without a running subscription.
    pub fn inject(&mut self, sample: LocationSample) -> Result<Option<Transition>, Error> {
        if !sample.is_finite() {
            return Err(Error::MalformedSample(sample.coordinate));
        }
        if !self.select_target(Seed::NearestTo(sample.coordinate)) {
            warn!(position = %sample.coordinate, "no target near injected position");
            return Ok(None);
        }
        Ok(self.process(sample))
    }

    fn hits_required(&self) -> u32 {
        let config = self.engine.config();
        match self.mode {
            HitMode::Normal => config.hits_required,
            HitMode::Accelerated => config.accelerated_hits_required,
        }
    }

    fn process(&mut self, sample: LocationSample) -> Option<Transition> {
        if !sample.is_finite() {
            debug!(position = %sample.coordinate, "discarding malformed sample");
            return None;
        }
        if self.fence.is_none() && !self.select_target(Seed::FirstUnfinished) {
            return None;
        }

        let hits_required = self.hits_required();
        let fence = self.fence.as_mut()?;
        let transition = self.engine.process_sample(
            fence,
            &sample.coordinate,
            sample.timestamp,
            hits_required,
        )?;
        let stop_id = fence.target().id.clone();

        match transition {
            Transition::Arrived => {
                self.set_status(&stop_id, StopStatus::Visiting);
                self.store.mark_arrived(&self.trip_id, &stop_id);
            }
            Transition::Departed => {
                self.set_status(&stop_id, StopStatus::Completed);
                self.store.mark_completed(&self.trip_id, &stop_id);
            }
        }
        self.sink.notify(Notification::Transition {
            stop_id,
            kind: transition,
            timestamp: sample.timestamp,
        });

        if transition == Transition::Departed {
            self.advance(sample.timestamp);
        }
        Some(transition)
    }

    fn advance(&mut self, timestamp: Timestamp) {
        if self.select_target(Seed::FirstUnfinished) {
            return;
        }
        info!(trip = %self.trip_id, "every stop finished");
        self.sink.notify(Notification::TripFinished { timestamp });
        self.stop();
    }

    /// Replaces the fence with a fresh one for the next target. Stops without a
    /// coordinate met on the way are marked skipped.
    fn select_target(&mut self, seed: Seed) -> bool {
        loop {
            let candidate = match seed {
                Seed::FirstUnfinished => first_unfinished(&self.stops),
                Seed::NearestTo(position) => nearest_unfinished(&self.stops, &position),
            }
            .cloned();

            let Some(stop) = candidate else {
                self.fence = None;
                return false;
            };
            if stop.coordinate().is_none() {
                warn!(
                    stop = %stop.id,
                    name = %stop.name,
                    raw = ?stop.coordinate,
                    "stop has no usable coordinate, skipping"
                );
                self.set_status(&stop.id, StopStatus::Skipped);
                self.store.mark_skipped(&self.trip_id, &stop.id);
                continue;
            }

            info!(stop = %stop.id, name = %stop.name, sequence = stop.sequence, "new geofence target");
            self.fence = Some(GeofenceState::new(stop));
            return true;
        }
    }

    /// After a reload keep the running fence if its stop is still open,
    /// otherwise move on to whatever the store says is next.
    fn reconcile_target(&mut self) {
        let Some(target) = self.fence.as_ref().map(|fence| fence.target.clone()) else {
            return;
        };
        let current = self
            .stops
            .iter()
            .find(|stop| stop.id == target.id && !stop.is_finished())
            .filter(|stop| stop.coordinate == target.coordinate)
            .cloned();
        if let Some(stop) = current
            && let Some(fence) = self.fence.as_mut()
        {
            fence.target = stop;
            return;
        }
        debug!(stop = %target.id, "target changed on reload");
        if !self.select_target(Seed::FirstUnfinished) && self.is_monitoring() {
            self.stop();
        }
    }

    fn set_status(&mut self, stop_id: &str, status: StopStatus) {
        self.stops
            .iter_mut()
            .filter(|stop| &*stop.id == stop_id)
            .for_each(|stop| stop.status = status);
    }
}

impl<P, S, N> Drop for TripProgressController<P, S, N> {
    fn drop(&mut self) {
        if let Some(inbox) = self.inbox.take() {
            inbox.close();
        }
    }
}
