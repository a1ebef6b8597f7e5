use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::client::ScheduleClient;
use crate::model::health::HealthSample;

/// Bounded, append-only record of upstream health checks. Oldest samples
/// fall off the front once `capacity` is reached.
#[derive(Debug)]
pub struct HealthLog {
    samples: Mutex<VecDeque<HealthSample>>,
    capacity: usize,
}

impl HealthLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, sample: HealthSample) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<HealthSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

pub async fn check_once(client: &ScheduleClient) -> HealthSample {
    match client.health().await {
        Ok(health) => HealthSample {
            checked_at: Utc::now(),
            online: health.status == "healthy",
            total_records: health.data.as_ref().and_then(|d| d.total_records),
            last_data_date: health.data.as_ref().and_then(|d| d.last_data_date),
            status: health.status,
        },
        Err(e) => {
            warn!(error = %e, "Upstream health check failed");
            HealthSample {
                checked_at: Utc::now(),
                online: false,
                status: e.to_string(),
                total_records: None,
                last_data_date: None,
            }
        }
    }
}

/// Polls upstream health on a fixed interval for as long as the server runs.
pub async fn poll_health(client: Arc<ScheduleClient>, log: Arc<HealthLog>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let sample = check_once(&client).await;
        debug!(online = sample.online, status = %sample.status, "Health sample recorded");
        log.push(sample);
    }
}
