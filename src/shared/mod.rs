pub mod geo;
pub mod time;

pub use geo::*;
pub use time::*;

use serde::{Deserialize, Serialize};

pub trait Identifiable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// Implemented by anything the optimizer and target selection can place on a map.
/// `None` means the record has no usable position and is never routed or fenced.
pub trait Locatable {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl Locatable for Coordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

/// A single reading pushed by a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub timestamp: Timestamp,
}

impl LocationSample {
    pub fn new(coordinate: Coordinate, timestamp: Timestamp) -> Self {
        Self {
            coordinate,
            timestamp,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.coordinate.is_finite()
    }
}
