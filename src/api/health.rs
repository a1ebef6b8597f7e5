use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::model::health::HealthSample;
use crate::utils::health_log::HealthLog;

#[derive(Debug, Deserialize, IntoParams)]
pub struct HealthLogQuery {
    /// Samples to return, newest first. Defaults to 20.
    pub limit: Option<usize>,
}

/// Recent upstream health samples
#[utoipa::path(
    get,
    path = "/api/health/log",
    params(HealthLogQuery),
    responses(
        (status = 200, description = "Newest first", body = [HealthSample])
    ),
    tag = "Health"
)]
pub async fn health_log(log: web::Data<HealthLog>, query: web::Query<HealthLogQuery>) -> HttpResponse {
    let samples: Vec<HealthSample> = log.recent(query.limit.unwrap_or(20));
    HttpResponse::Ok().json(samples)
}
