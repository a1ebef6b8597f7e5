//! HTTP client for the upstream SKUD attendance API.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::model::attendance::{DaySchedule, EmployeeDayRecord, RangeSchedule, ScheduleFeed};
use crate::model::department::Department;
use crate::model::employee::{EmployeeList, EmployeeSummary, FullNameUpdate};
use crate::model::health::UpstreamHealth;
use crate::schedule::session::{FetchRequest, ScheduleQuery};
use crate::utils::dates::format_date;
use crate::utils::session_store::SessionStore;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid upstream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Сессия истекла. Требуется повторная авторизация.")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

/// `employee-schedule` as sent over the wire: per-employee rows without a
/// date of their own.
#[derive(Debug, Deserialize)]
struct DayScheduleWire {
    date: NaiveDate,
    employees: Vec<Value>,
    total_count: u64,
    late_count: u64,
}

impl DayScheduleWire {
    /// Gives every row the response's date.
    fn into_schedule(self) -> Result<DaySchedule, serde_json::Error> {
        let date = Value::String(format_date(self.date));
        let employees = self
            .employees
            .into_iter()
            .map(|mut row| {
                if let Value::Object(fields) = &mut row {
                    fields.insert("date".to_string(), date.clone());
                }
                serde_json::from_value::<EmployeeDayRecord>(row)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DaySchedule {
            date: self.date,
            employees,
            total_count: self.total_count,
            late_count: self.late_count,
        })
    }
}

pub struct ScheduleClient {
    http: reqwest::Client,
    base: Url,
    store: Arc<SessionStore>,
}

impl ScheduleClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<SessionStore>,
    ) -> Result<Self, ClientError> {
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base, store })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|e| ClientError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match self.store.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("Upstream rejected the stored token, clearing it");
            if let Err(e) = self.store.clear_token() {
                warn!(error = %e, "Failed to clear stored token");
            }
            return Err(ClientError::Unauthorized);
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let body = self.send(self.request(Method::GET, path)?.query(query)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self), fields(ticket = req.ticket.id()))]
    pub async fn fetch_schedule(&self, req: &FetchRequest) -> Result<ScheduleFeed, ClientError> {
        let paging = [
            ("page", req.page.to_string()),
            ("per_page", req.per_page.to_string()),
        ];

        let feed = match req.query {
            ScheduleQuery::Day { date } => {
                let mut query = Vec::from(paging);
                if let Some(date) = date {
                    query.push(("date", format_date(date)));
                }
                let wire: DayScheduleWire = self.get_json("employee-schedule", &query).await?;
                ScheduleFeed::Day(wire.into_schedule()?)
            }
            ScheduleQuery::Range { start, end } => {
                let mut query = Vec::from(paging);
                query.push(("start_date", format_date(start)));
                query.push(("end_date", format_date(end)));
                let range: RangeSchedule =
                    self.get_json("employee-schedule-range", &query).await?;
                ScheduleFeed::Range(range)
            }
        };

        debug!(
            total_count = feed.total_count(),
            late_count = feed.late_count(),
            "Schedule fetched"
        );
        Ok(feed)
    }

    pub async fn departments(&self) -> Result<Vec<Department>, ClientError> {
        self.get_json("departments", &[]).await
    }

    pub async fn employees(&self) -> Result<Vec<EmployeeSummary>, ClientError> {
        let list: EmployeeList = self.get_json("employees/simple", &[]).await?;
        Ok(list.employees)
    }

    pub async fn update_full_name(&self, update: &FullNameUpdate) -> Result<(), ClientError> {
        let path = format!("employees/{}/full-name", update.employee_id);
        self.send(self.request(Method::PUT, &path)?.json(update))
            .await
            .map(|_| ())
    }

    pub async fn health(&self) -> Result<UpstreamHealth, ClientError> {
        self.get_json("health", &[]).await
    }
}
