use std::path::Path;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use waymark::{
    progress::{self, LocationProvider, SampleInbox},
    shared::{Coordinate, Duration, LocationSample, Timestamp},
};

#[derive(Debug, Deserialize)]
struct SampleRecord {
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lon: f64,
    #[serde(alias = "ts")]
    timestamp: Option<i64>,
}

/// Reads `lat,lon[,timestamp]` rows. Rows without a timestamp are spaced
/// `interval` apart from the previous one.
pub fn load_samples(path: &Path, interval: Duration) -> anyhow::Result<Vec<LocationSample>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut samples = Vec::new();
    let mut clock = Timestamp::now();
    for record in reader.deserialize() {
        let record: SampleRecord = record?;
        let timestamp = match record.timestamp {
            Some(millis) => Timestamp::from_millis(millis),
            None => clock,
        };
        clock = timestamp + interval;
        samples.push(LocationSample::new(
            Coordinate::new(record.lat, record.lon),
            timestamp,
        ));
    }
    Ok(samples)
}

/// Plays recorded samples into the controller's inbox on a tokio task,
/// `speed` times faster than the configured interval.
pub struct ReplayProvider {
    samples: Vec<LocationSample>,
    speed: f64,
    task: Option<JoinHandle<()>>,
}

impl ReplayProvider {
    pub fn new(samples: Vec<LocationSample>, speed: f64) -> Self {
        Self {
            samples,
            speed: speed.max(f64::EPSILON),
            task: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl LocationProvider for ReplayProvider {
    fn subscribe(&mut self, inbox: SampleInbox, interval: Duration) -> Result<(), progress::Error> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| progress::Error::Provider(err.to_string()))?;
        let samples = self.samples.clone();
        let pause = interval.to_std().div_f64(self.speed);
        info!(samples = samples.len(), ?pause, "replay started");
        self.task = Some(runtime.spawn(async move {
            for sample in samples {
                tokio::time::sleep(pause).await;
                if !inbox.push(sample) {
                    debug!("inbox closed, ending replay");
                    break;
                }
            }
        }));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
