use std::{
    cmp,
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS: Distance = Distance::from_meters(6_371_000.0);

/// Beijing city center, the default reference point for route sanity checks.
pub const DEFAULT_REGION_CENTER: Coordinate = Coordinate {
    latitude: 39.9087,
    longitude: 116.3975,
};
pub const DEFAULT_REGION_RADIUS: Distance = Distance::from_kilometers(80.0);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Distance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, value| acc + value)
    }
}

impl Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}m", self.0)
    }
}

impl Distance {
    pub const ZERO: Self = Self(0.0);

    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }

    /// Total ordering over the underlying float, NaN sorts last.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great circle distance using the haversine formula.
    pub fn distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        Distance::from_meters(EARTH_RADIUS.as_meters() * c)
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Upstream feeds use `0, 0` to mean "no position".
    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Stops are only accepted in the north eastern quadrant the trips are planned in.
    pub fn in_valid_range(&self) -> bool {
        self.latitude > 0.0 && self.latitude < 90.0 && self.longitude > 0.0 && self.longitude < 180.0
    }

    /// Finite, not the sentinel and inside the accepted range. Anything else is
    /// neither routed nor fenced.
    pub fn is_usable(&self) -> bool {
        self.is_finite() && !self.is_sentinel() && self.in_valid_range()
    }
}

/// Free function form of [`Coordinate::distance`].
pub fn distance(a: &Coordinate, b: &Coordinate) -> Distance {
    a.distance(b)
}

/// Circular area a user position must fall in before the optimizer trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: Coordinate,
    pub radius: Distance,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            center: DEFAULT_REGION_CENTER,
            radius: DEFAULT_REGION_RADIUS,
        }
    }
}

impl Region {
    pub fn new(center: Coordinate, radius: Distance) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.is_finite() && self.center.distance(coordinate) <= self.radius
    }
}

#[test]
fn usable_coordinates() {
    assert!(Coordinate::new(39.9175, 116.3972).is_usable());
    assert!(!Coordinate::new(0.0, 0.0).is_usable());
    assert!(!Coordinate::new(39.9175, f64::INFINITY).is_usable());
    assert!(!Coordinate::new(-33.86, 151.2).is_usable());
    assert!(!Coordinate::new(40.7, -74.0).is_usable());
}

#[test]
fn distance_display_in_meters() {
    assert_eq!(Distance::from_kilometers(0.15).to_string(), "150.0m");
}

#[test]
fn region_contains_test() {
    let region = Region::default();
    assert!(region.contains(&Coordinate::new(39.9175, 116.3972)));
    assert!(!region.contains(&Coordinate::new(31.2304, 121.4737)));
    assert!(!region.contains(&Coordinate::new(f64::NAN, 116.3972)));
}
