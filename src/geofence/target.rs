use tracing::debug;

use crate::{
    shared::{Coordinate, Distance, Locatable},
    trip::Stop,
};

/// First stop by `sequence` that is neither completed nor skipped.
/// Equal sequence numbers resolve to the earliest stop in the slice.
///
/// Skipped stops are excluded as well as completed ones, unlike the older
/// client that only passed over completed stops. A skipped stop is finished
/// for the trip store too, and selecting it again would loop on it.
pub fn first_unfinished(stops: &[Stop]) -> Option<&Stop> {
    stops
        .iter()
        .filter(|stop| !stop.is_finished())
        .min_by_key(|stop| stop.sequence)
}

/// Unfinished stop closest to `position`. Stops without a coordinate are skipped.
pub fn nearest_unfinished<'a>(stops: &'a [Stop], position: &Coordinate) -> Option<&'a Stop> {
    if !position.is_finite() {
        return None;
    }
    let mut nearest: Option<(&Stop, Distance)> = None;
    for stop in stops.iter().filter(|stop| !stop.is_finished()) {
        let Some(coordinate) = stop.coordinate() else {
            debug!(stop = %stop.id, "skipping stop without usable coordinate");
            continue;
        };
        let distance = position.distance(&coordinate);
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((stop, distance));
        }
    }
    nearest.map(|(stop, _)| stop)
}
