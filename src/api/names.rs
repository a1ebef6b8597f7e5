use actix_web::{HttpResponse, web};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::client::{ClientError, ScheduleClient};
use crate::config::Config;
use crate::error::ApiError;
use crate::schedule::names::{NameMatchReport, match_names as match_name_lists, parse_name_lines, plan_updates};

/// Contents of the two uploaded text files, one name per line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NameLists {
    #[schema(example = "Иванов И.И.\nПетров П.П.")]
    pub short_names: String,
    #[schema(example = "Иванов Иван Иванович\nПетров Петр Петрович")]
    pub full_names: String,
}

impl NameLists {
    fn report(&self) -> NameMatchReport {
        match_name_lists(
            &parse_name_lines(&self.short_names),
            &parse_name_lines(&self.full_names),
        )
    }
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct ApplyReport {
    pub matched: usize,
    pub not_matched: usize,
    pub updated: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Preview how short names pair up with full names
#[utoipa::path(
    post,
    path = "/api/names/match",
    request_body = NameLists,
    responses(
        (status = 200, description = "Matching report", body = NameMatchReport)
    ),
    tag = "Names"
)]
pub async fn match_names(body: web::Json<NameLists>) -> HttpResponse {
    HttpResponse::Ok().json(body.report())
}

/// Match names and store the expanded forms upstream
#[utoipa::path(
    post,
    path = "/api/names/apply",
    request_body = NameLists,
    responses(
        (status = 200, description = "Update counts", body = ApplyReport),
        (status = 401, description = "Upstream session expired"),
        (status = 502, description = "Employee list unavailable")
    ),
    tag = "Names"
)]
#[instrument(skip_all)]
pub async fn apply_names(
    client: web::Data<ScheduleClient>,
    config: web::Data<Config>,
    body: web::Json<NameLists>,
) -> Result<HttpResponse, ApiError> {
    let report = body.report();
    let employees = client.employees().await?;
    let (updates, unknown) = plan_updates(&report.mapping, &employees);
    info!(
        matched = report.matched,
        updates = updates.len(),
        unknown,
        "Applying expanded names"
    );

    let results: Vec<Result<(), ClientError>> = stream::iter(updates)
        .map(|update| {
            let client = client.clone();
            async move {
                let result = client.update_full_name(&update).await;
                if let Err(e) = &result {
                    warn!(employee_id = update.employee_id, error = %e, "Full name update failed");
                }
                result
            }
        })
        .buffer_unordered(config.name_update_concurrency.max(1))
        .collect()
        .await;

    let mut summary = ApplyReport {
        matched: report.matched,
        not_matched: report.not_matched,
        not_found: unknown,
        ..Default::default()
    };
    for result in results {
        match result {
            Ok(()) => summary.updated += 1,
            Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized.into()),
            Err(e) if e.is_not_found() => summary.not_found += 1,
            Err(_) => summary.failed += 1,
        }
    }
    Ok(HttpResponse::Ok().json(summary))
}
