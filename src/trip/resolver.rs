use serde::Deserialize;
use tracing::debug;

use crate::shared::Coordinate;

/// A number that upstream feeds send either as a JSON number or as a string.
/// Any other JSON value is kept so the record still deserializes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawNumber {
    /// Unparseable text and non numeric values become NaN so they are rejected
    /// with the other bad values.
    pub fn value(&self) -> f64 {
        match self {
            RawNumber::Number(value) => *value,
            RawNumber::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
            RawNumber::Other(_) => f64::NAN,
        }
    }

    /// Whole, non negative values that fit a `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        let value = self.value();
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
            .then_some(value as u32)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Nested `location` / `coords` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPoint {
    pub lat: Option<RawNumber>,
    pub lng: Option<RawNumber>,
    pub lon: Option<RawNumber>,
    pub latitude: Option<RawNumber>,
    pub longitude: Option<RawNumber>,
}

/// A stop record as it arrives from the trip store or a planning feed.
/// Field names vary between sources so every alias is kept as its own field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStop {
    pub id: Option<RawId>,
    #[serde(rename = "_stopId", alias = "stopId", alias = "stop_id")]
    pub stop_id: Option<RawId>,
    pub name: Option<String>,
    #[serde(alias = "sequence")]
    pub seq: Option<RawNumber>,
    #[serde(rename = "_seq")]
    pub internal_seq: Option<RawNumber>,
    pub status: Option<String>,
    #[serde(rename = "_status")]
    pub internal_status: Option<String>,
    pub lat: Option<RawNumber>,
    pub lon: Option<RawNumber>,
    pub latitude: Option<RawNumber>,
    pub longitude: Option<RawNumber>,
    pub location: Option<RawPoint>,
    pub coords: Option<RawPoint>,
}

impl RawStop {
    pub fn id(&self) -> Option<String> {
        self.stop_id
            .clone()
            .or_else(|| self.id.clone())
            .map(RawId::into_string)
    }

    pub fn sequence(&self) -> Option<u32> {
        self.seq
            .as_ref()
            .and_then(RawNumber::as_u32)
            .or_else(|| self.internal_seq.as_ref().and_then(RawNumber::as_u32))
    }

    pub fn status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or(self.internal_status.as_deref())
    }
}

fn pair(lat: &Option<RawNumber>, lon: &Option<RawNumber>) -> Option<(f64, f64)> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some((lat.value(), lon.value())),
        _ => None,
    }
}

/// Finds the first complete latitude/longitude pair, in this order:
///
/// 1. `lat` / `lon`
/// 2. `latitude` / `longitude`
/// 3. `location.lat` / `location.lng`, then `location.lat` / `location.lon`,
///    then `location.latitude` / `location.longitude`
/// 4. `coords.lat` / `coords.lon`, then `coords.latitude` / `coords.longitude`
///    (only when there is no `location` object at all)
fn find_pair(raw: &RawStop) -> Option<(f64, f64)> {
    pair(&raw.lat, &raw.lon)
        .or_else(|| pair(&raw.latitude, &raw.longitude))
        .or_else(|| match &raw.location {
            // A present `location` settles it, `coords` is not consulted
            Some(location) => pair(&location.lat, &location.lng)
                .or_else(|| pair(&location.lat, &location.lon))
                .or_else(|| pair(&location.latitude, &location.longitude)),
            None => raw.coords.as_ref().and_then(|coords| {
                pair(&coords.lat, &coords.lon).or_else(|| pair(&coords.latitude, &coords.longitude))
            }),
        })
}

/// Extracts a usable coordinate from a stop record.
///
/// Returns `None` when no pair is present, when either value is not a number,
/// when the pair is exactly `0, 0` (the "no data" sentinel) or when it lies
/// outside the accepted range.
pub fn resolve(raw: &RawStop) -> Option<Coordinate> {
    let Some((latitude, longitude)) = find_pair(raw) else {
        debug!(stop = ?raw.id(), "no coordinate fields on stop");
        return None;
    };
    let coordinate = Coordinate::new(latitude, longitude);
    if coordinate.is_sentinel() {
        debug!(stop = ?raw.id(), "stop coordinate is the 0,0 sentinel");
        return None;
    }
    if !coordinate.is_usable() {
        debug!(stop = ?raw.id(), %coordinate, "stop coordinate out of range");
        return None;
    }
    Some(coordinate)
}
