use serde::Serialize;

use crate::{
    shared::{Distance, Timestamp},
    trip::Stop,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FenceStatus {
    Inside,
    #[default]
    Outside,
}

/// Debounce and cooldown bookkeeping for the single active target.
/// Rebuilt from scratch every time the target changes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceState {
    pub(crate) target: Stop,
    pub(crate) last_status: FenceStatus,
    pub(crate) arrive_hits: u32,
    pub(crate) leave_hits: u32,
    pub(crate) last_arrive: Timestamp,
    pub(crate) last_leave: Timestamp,
    pub(crate) last_distance: Option<Distance>,
}

impl GeofenceState {
    pub fn new(target: Stop) -> Self {
        Self {
            target,
            last_status: FenceStatus::Outside,
            arrive_hits: 0,
            leave_hits: 0,
            last_arrive: Timestamp::EPOCH,
            last_leave: Timestamp::EPOCH,
            last_distance: None,
        }
    }

    pub fn target(&self) -> &Stop {
        &self.target
    }

    pub fn last_status(&self) -> FenceStatus {
        self.last_status
    }

    pub fn arrive_hits(&self) -> u32 {
        self.arrive_hits
    }

    pub fn leave_hits(&self) -> u32 {
        self.leave_hits
    }

    pub fn last_arrive(&self) -> Timestamp {
        self.last_arrive
    }

    pub fn last_leave(&self) -> Timestamp {
        self.last_leave
    }

    /// Distance measured by the most recent accepted sample.
    pub fn last_distance(&self) -> Option<Distance> {
        self.last_distance
    }

    pub(crate) fn reset_hits(&mut self) {
        self.arrive_hits = 0;
        self.leave_hits = 0;
    }
}
