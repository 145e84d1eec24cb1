use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::shared::{Coordinate, Distance, Identifiable, Locatable, Region};

/// Orders stops into a visiting sequence with a nearest neighbor heuristic.
///
/// With a trusted user position the route is a single greedy pass starting at
/// the user. Without one every stop is tried as the starting point and the
/// shortest resulting path wins. That search is `O(n^3)`; trips are small by
/// construction and there is no cheaper fallback for large inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptimizer {
    region: Region,
}

impl RouteOptimizer {
    pub fn new(region: Region) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Returns a permutation of `stops`. Stops without a coordinate keep their
    /// relative order and are placed after every routed stop.
    pub fn optimize<T>(&self, stops: Vec<T>, user_position: Option<Coordinate>) -> Vec<T>
    where
        T: Locatable + Send,
    {
        let mut with_coord: Vec<(T, Coordinate)> = Vec::with_capacity(stops.len());
        let mut without_coord: Vec<T> = Vec::new();
        for stop in stops {
            match stop.coordinate() {
                Some(coordinate) => with_coord.push((stop, coordinate)),
                None => without_coord.push(stop),
            }
        }

        if with_coord.len() <= 1 {
            return with_coord
                .into_iter()
                .map(|(stop, _)| stop)
                .chain(without_coord)
                .collect();
        }

        let user_position = user_position.filter(|position| {
            let trusted = self.region.contains(position);
            if !trusted {
                debug!(%position, "user position outside route region, ignoring it");
            }
            trusted
        });

        let points: Vec<Coordinate> = with_coord.iter().map(|(_, coord)| *coord).collect();
        let order = match user_position {
            Some(position) => nearest_neighbor(&points, position, (0..points.len()).collect()),
            None => best_start(&points),
        };
        debug!(
            stops = points.len(),
            anchored = user_position.is_some(),
            length = %path_length(&points, &order),
            "optimized route"
        );

        let mut slots: Vec<Option<T>> = with_coord.into_iter().map(|(stop, _)| Some(stop)).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .chain(without_coord)
            .collect()
    }
}

/// Greedy pass from `from` over `remaining`, which must hold indexes into
/// `points` in their original order. Ties go to the earliest index.
fn nearest_neighbor(points: &[Coordinate], from: Coordinate, mut remaining: Vec<usize>) -> Vec<usize> {
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = from;
    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut best = Distance::from_meters(f64::INFINITY);
        for (position, idx) in remaining.iter().enumerate() {
            let distance = current.distance(&points[*idx]);
            if distance < best {
                best = distance;
                nearest = position;
            }
        }
        let idx = remaining.remove(nearest);
        ordered.push(idx);
        current = points[idx];
    }
    ordered
}

fn best_start(points: &[Coordinate]) -> Vec<usize> {
    (0..points.len())
        .into_par_iter()
        .map(|start| {
            let remaining = (0..points.len()).filter(|idx| *idx != start).collect();
            let mut route = Vec::with_capacity(points.len());
            route.push(start);
            route.extend(nearest_neighbor(points, points[start], remaining));
            let length = path_length(points, &route);
            (start, length, route)
        })
        .min_by(|(start_a, length_a, _), (start_b, length_b, _)| {
            length_a.total_cmp(length_b).then(start_a.cmp(start_b))
        })
        .map(|(_, _, route)| route)
        .unwrap_or_else(|| (0..points.len()).collect())
}

fn path_length(points: &[Coordinate], order: &[usize]) -> Distance {
    order
        .windows(2)
        .map(|pair| points[pair[0]].distance(&points[pair[1]]))
        .sum()
}

/// Sum of consecutive distances between the stops that have a coordinate.
pub fn route_length<T: Locatable>(stops: &[T]) -> Distance {
    let points: Vec<Coordinate> = stops.iter().filter_map(Locatable::coordinate).collect();
    points.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
}

/// Re-applies a previously saved visiting order. Stops named in `order` come
/// first in that order, unknown ids are ignored, and stops that are not named
/// follow in their original order.
pub fn apply_order<T, S>(stops: Vec<T>, order: &[S]) -> Vec<T>
where
    T: Identifiable,
    S: AsRef<str>,
{
    let mut slots: Vec<Option<T>> = stops.into_iter().map(Some).collect();
    let lookup: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .rev()
        .filter_map(|(idx, slot)| slot.as_ref().map(|stop| (stop.id().to_string(), idx)))
        .collect();

    let mut ordered = Vec::with_capacity(slots.len());
    for id in order {
        if let Some(idx) = lookup.get(id.as_ref())
            && let Some(stop) = slots[*idx].take()
        {
            ordered.push(stop);
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}
