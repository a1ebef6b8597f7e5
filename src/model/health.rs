use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upstream `health` payload. Only the fields the poller records.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamHealth {
    pub status: String,
    #[serde(default)]
    pub data: Option<UpstreamHealthData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamHealthData {
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub last_data_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HealthSample {
    #[schema(value_type = String, format = "date-time")]
    pub checked_at: DateTime<Utc>,
    pub online: bool,
    #[schema(example = "healthy")]
    pub status: String,
    pub total_records: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub last_data_date: Option<NaiveDate>,
}
