use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    geofence::Error,
    shared::{Coordinate, Distance, Duration, Region},
};

pub const ENV_ARRIVE_RADIUS_M: &str = "WAYMARK_ARRIVE_RADIUS_M";
pub const ENV_LEAVE_RADIUS_M: &str = "WAYMARK_LEAVE_RADIUS_M";
pub const ENV_HITS_REQUIRED: &str = "WAYMARK_HITS_REQUIRED";
pub const ENV_ACCELERATED_HITS_REQUIRED: &str = "WAYMARK_ACCELERATED_HITS_REQUIRED";
pub const ENV_COOLDOWN_ARRIVE_MS: &str = "WAYMARK_COOLDOWN_ARRIVE_MS";
pub const ENV_COOLDOWN_LEAVE_MS: &str = "WAYMARK_COOLDOWN_LEAVE_MS";
pub const ENV_SAMPLE_INTERVAL_MS: &str = "WAYMARK_SAMPLE_INTERVAL_MS";
pub const ENV_REGION_CENTER: &str = "WAYMARK_REGION_CENTER";
pub const ENV_REGION_RADIUS_KM: &str = "WAYMARK_REGION_RADIUS_KM";

/// Process wide geofence tuning. Loaded once and shared read only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    pub arrive_radius: Distance,
    /// Must be strictly larger than `arrive_radius`. The gap is the hysteresis band.
    pub leave_radius: Distance,
    pub hits_required: u32,
    /// Used instead of `hits_required` when the controller runs in accelerated mode.
    pub accelerated_hits_required: u32,
    pub cooldown_arrive: Duration,
    pub cooldown_leave: Duration,
    pub sample_interval: Duration,
    pub region: Region,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            arrive_radius: Distance::from_meters(100.0),
            leave_radius: Distance::from_meters(150.0),
            hits_required: 2,
            accelerated_hits_required: 1,
            cooldown_arrive: Duration::from_seconds(30),
            cooldown_leave: Duration::from_seconds(30),
            sample_interval: Duration::from_seconds(5),
            region: Region::default(),
        }
    }
}

impl GeofenceConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_radii(mut self, arrive: Distance, leave: Distance) -> Self {
        self.arrive_radius = arrive;
        self.leave_radius = leave;
        self
    }

    pub fn with_hits_required(mut self, normal: u32, accelerated: u32) -> Self {
        self.hits_required = normal;
        self.accelerated_hits_required = accelerated;
        self
    }

    pub fn with_cooldowns(mut self, arrive: Duration, leave: Duration) -> Self {
        self.cooldown_arrive = arrive;
        self.cooldown_leave = leave;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        for radius in [self.arrive_radius, self.leave_radius, self.region.radius] {
            if !radius.as_meters().is_finite() || radius.as_meters() <= 0.0 {
                return Err(Error::InvalidRadius(radius));
            }
        }
        if self.leave_radius <= self.arrive_radius {
            return Err(Error::InvalidRadii {
                arrive: self.arrive_radius,
                leave: self.leave_radius,
            });
        }
        if self.hits_required == 0 || self.accelerated_hits_required == 0 {
            return Err(Error::InvalidHitCount);
        }
        if self.cooldown_arrive < Duration::ZERO || self.cooldown_leave < Duration::ZERO {
            return Err(Error::NegativeCooldown);
        }
        if self.sample_interval <= Duration::ZERO {
            return Err(Error::InvalidSampleInterval(self.sample_interval));
        }
        if !self.region.center.is_finite() {
            return Err(Error::InvalidRegionCenter(self.region.center));
        }
        Ok(())
    }

    /// Defaults overridden by any `WAYMARK_*` environment variable that is set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`GeofenceConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(meters) = parse_var::<f64, _>(&lookup, ENV_ARRIVE_RADIUS_M)? {
            config.arrive_radius = Distance::from_meters(meters);
        }
        if let Some(meters) = parse_var::<f64, _>(&lookup, ENV_LEAVE_RADIUS_M)? {
            config.leave_radius = Distance::from_meters(meters);
        }
        if let Some(hits) = parse_var(&lookup, ENV_HITS_REQUIRED)? {
            config.hits_required = hits;
        }
        if let Some(hits) = parse_var(&lookup, ENV_ACCELERATED_HITS_REQUIRED)? {
            config.accelerated_hits_required = hits;
        }
        if let Some(millis) = parse_var(&lookup, ENV_COOLDOWN_ARRIVE_MS)? {
            config.cooldown_arrive = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_var(&lookup, ENV_COOLDOWN_LEAVE_MS)? {
            config.cooldown_leave = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_var(&lookup, ENV_SAMPLE_INTERVAL_MS)? {
            config.sample_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_REGION_CENTER) {
            config.region.center = parse_center(&value).ok_or(Error::InvalidEnv {
                name: ENV_REGION_CENTER,
                value,
            })?;
        }
        if let Some(km) = parse_var::<f64, _>(&lookup, ENV_REGION_RADIUS_KM)? {
            config.region.radius = Distance::from_kilometers(km);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, Error>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidEnv { name, value }),
    }
}

/// Parses `"lat,lon"`.
pub(crate) fn parse_center(value: &str) -> Option<Coordinate> {
    let (lat, lon) = value.split_once(',')?;
    let coordinate = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    coordinate.is_finite().then_some(coordinate)
}
