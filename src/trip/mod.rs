mod resolver;
pub use resolver::*;

use std::{fmt::Display, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::shared::{Coordinate, Identifiable, Locatable};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    #[default]
    Upcoming,
    /// The user is at the stop. Backends also call this `ARRIVED`.
    #[serde(alias = "ARRIVED")]
    Visiting,
    Completed,
    Skipped,
}

impl StopStatus {
    /// Completed and skipped stops are never targeted again.
    pub fn is_finished(&self) -> bool {
        matches!(self, StopStatus::Completed | StopStatus::Skipped)
    }
}

impl Display for StopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            StopStatus::Upcoming => "UPCOMING",
            StopStatus::Visiting => "VISITING",
            StopStatus::Completed => "COMPLETED",
            StopStatus::Skipped => "SKIPPED",
        };
        f.write_str(value)
    }
}

impl FromStr for StopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPCOMING" => Ok(StopStatus::Upcoming),
            "VISITING" | "ARRIVED" => Ok(StopStatus::Visiting),
            "COMPLETED" => Ok(StopStatus::Completed),
            "SKIPPED" => Ok(StopStatus::Skipped),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stop {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub sequence: u32,
    pub coordinate: Option<Coordinate>,
    pub status: StopStatus,
}

impl Stop {
    pub fn new(id: impl Into<Arc<str>>, sequence: u32, coordinate: Option<Coordinate>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            sequence,
            coordinate,
            status: StopStatus::Upcoming,
        }
    }

    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: StopStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

impl Identifiable for Stop {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Only usable coordinates are exposed, whatever source built the stop.
impl Locatable for Stop {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate.filter(Coordinate::is_usable)
    }
}

impl From<RawStop> for Stop {
    fn from(value: RawStop) -> Self {
        let coordinate = resolve(&value);
        let id: Arc<str> = value.id().unwrap_or_default().into();
        let sequence = value.sequence().unwrap_or(0);
        let status: StopStatus = value
            .status()
            .and_then(|status| status.parse().ok())
            .unwrap_or_default();
        let name: Arc<str> = value.name.map(Into::into).unwrap_or_else(|| id.clone());
        Self {
            id,
            name,
            sequence,
            coordinate,
            status,
        }
    }
}

/// Parses a JSON array of heterogeneous stop records.
///
/// Only a payload that is not a JSON array is an error. Records that can not be
/// read as a stop are dropped one by one.
pub fn parse_stops(json: &str) -> Result<Vec<Stop>, serde_json::Error> {
    let records: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let stops = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<RawStop>(record) {
            Ok(raw) => Some(Stop::from(raw)),
            Err(err) => {
                warn!(record = idx, %err, "dropping unreadable stop record");
                None
            }
        })
        .collect();
    Ok(stops)
}

#[test]
fn parse_stops_mixes_aliases() {
    let stops = parse_stops(
        r#"[
            {"_stopId": "a", "name": "Forbidden City", "seq": 2, "lat": 39.9163, "lon": 116.3972},
            {"id": 9, "_seq": 1, "status": "COMPLETED", "location": {"lat": "39.8822", "lng": "116.4066"}},
            {"id": "c", "seq": 3, "lat": 0, "lon": 0}
        ]"#,
    )
    .unwrap();
    assert_eq!(stops.len(), 3);
    assert_eq!(&*stops[0].name, "Forbidden City");
    assert_eq!(stops[0].sequence, 2);
    assert_eq!(&*stops[1].id, "9");
    assert_eq!(&*stops[1].name, "9");
    assert_eq!(stops[1].status, StopStatus::Completed);
    assert_eq!(stops[1].coordinate, Some(Coordinate::new(39.8822, 116.4066)));
    assert_eq!(stops[2].coordinate, None);
}

#[test]
fn status_parse_accepts_backend_names() {
    assert_eq!("ARRIVED".parse::<StopStatus>(), Ok(StopStatus::Visiting));
    assert_eq!("completed".parse::<StopStatus>(), Ok(StopStatus::Completed));
    assert!("LOST".parse::<StopStatus>().is_err());
}

#[test]
fn finished_covers_completed_and_skipped() {
    assert!(StopStatus::Completed.is_finished());
    assert!(StopStatus::Skipped.is_finished());
    assert!(!StopStatus::Visiting.is_finished());
    assert!(!StopStatus::Upcoming.is_finished());
}

#[test]
fn parse_stops_drops_only_bad_records() {
    let stops = parse_stops(
        r#"[
            {"id": "a", "seq": "2", "lat": 39.9163, "lon": 116.3972},
            {"id": "b", "seq": 3, "lat": true, "lon": 116.3972},
            "not a stop",
            {"id": "d", "name": 42, "lat": 39.93, "lon": 116.40},
            {"id": "e", "seq": 5, "lat": 39.94, "lon": 116.41}
        ]"#,
    )
    .unwrap();
    let ids: Vec<&str> = stops.iter().map(|stop| &*stop.id).collect();
    assert_eq!(ids, vec!["a", "b", "e"]);
    assert_eq!(stops[0].sequence, 2);
    assert_eq!(stops[1].coordinate, None);
}

#[test]
fn unusable_coordinates_are_hidden_from_routing() {
    let sentinel = Stop::new("sentinel", 1, Some(Coordinate::new(0.0, 0.0)));
    let nan = Stop::new("nan", 2, Some(Coordinate::new(f64::NAN, 116.4)));
    let south = Stop::new("south", 3, Some(Coordinate::new(-33.86, 151.2)));
    let ok = Stop::new("ok", 4, Some(Coordinate::new(39.9, 116.4)));
    assert_eq!(Locatable::coordinate(&sentinel), None);
    assert_eq!(Locatable::coordinate(&nan), None);
    assert_eq!(Locatable::coordinate(&south), None);
    assert_eq!(Locatable::coordinate(&ok), Some(Coordinate::new(39.9, 116.4)));
}
