mod config;
mod state;
pub mod target;

pub use config::*;
pub use state::*;

use std::{fmt::Display, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::shared::{Coordinate, Distance, Duration, Locatable, Timestamp};

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Leave radius {leave} must be larger than arrive radius {arrive}")]
    InvalidRadii { arrive: Distance, leave: Distance },
    #[error("Radius {0} must be a positive finite distance")]
    InvalidRadius(Distance),
    #[error("Hit count must be at least 1")]
    InvalidHitCount,
    #[error("Cooldowns can not be negative")]
    NegativeCooldown,
    #[error("Sample interval must be positive, got {0:?}")]
    InvalidSampleInterval(Duration),
    #[error("Region center {0} is not a finite coordinate")]
    InvalidRegionCenter(Coordinate),
    #[error("Environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Confirmed change of presence at the active target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Arrived,
    Departed,
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Arrived => f.write_str("ARRIVED"),
            Transition::Departed => f.write_str("DEPARTED"),
        }
    }
}

/// Runs the arrive/leave state machine against a validated configuration.
#[derive(Debug, Clone)]
pub struct GeofenceEngine {
    config: Arc<GeofenceConfig>,
}

impl GeofenceEngine {
    pub fn new(config: GeofenceConfig) -> Result<Self, self::Error> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &GeofenceConfig {
        &self.config
    }

    /// Feeds one position into `state`.
    ///
    /// Inside `arrive_radius` counts towards arrival, beyond `leave_radius`
    /// counts towards departure, and anything in between clears both counters.
    /// A transition fires once `hits_required` consecutive hits are seen, the
    /// state is on the opposite side, and the matching cooldown has elapsed.
    ///
    /// Non finite samples and targets without a coordinate leave `state` untouched.
    pub fn process_sample(
        &self,
        state: &mut GeofenceState,
        sample: &Coordinate,
        now: Timestamp,
        hits_required: u32,
    ) -> Option<Transition> {
        let Some(target) = state.target.coordinate() else {
            debug!(stop = %state.target.id, "target has no usable coordinate, ignoring sample");
            return None;
        };
        if !sample.is_finite() {
            debug!(%sample, "discarding malformed sample");
            return None;
        }

        let distance = sample.distance(&target);
        state.last_distance = Some(distance);

        if distance <= self.config.arrive_radius {
            state.arrive_hits += 1;
            state.leave_hits = 0;
            debug!(
                stop = %state.target.id,
                %distance,
                hits = state.arrive_hits,
                hits_required,
                "inside arrive radius"
            );
            if state.last_status == FenceStatus::Outside
                && state.arrive_hits >= hits_required
                && now - state.last_arrive > self.config.cooldown_arrive
            {
                state.last_status = FenceStatus::Inside;
                state.last_arrive = now;
                state.arrive_hits = 0;
                info!(stop = %state.target.id, %distance, "arrived");
                return Some(Transition::Arrived);
            }
        } else if distance > self.config.leave_radius {
            state.leave_hits += 1;
            state.arrive_hits = 0;
            debug!(
                stop = %state.target.id,
                %distance,
                hits = state.leave_hits,
                hits_required,
                "outside leave radius"
            );
            if state.last_status == FenceStatus::Inside
                && state.leave_hits >= hits_required
                && now - state.last_leave > self.config.cooldown_leave
            {
                state.last_status = FenceStatus::Outside;
                state.last_leave = now;
                state.leave_hits = 0;
                info!(stop = %state.target.id, %distance, "departed");
                return Some(Transition::Departed);
            }
        } else {
            debug!(stop = %state.target.id, %distance, "in hysteresis band");
            state.reset_hits();
        }
        None
    }
}
