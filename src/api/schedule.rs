use std::collections::BTreeSet;

use actix_web::http::header::{
    Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::api::view_session::ViewSession;
use crate::client::{ClientError, ScheduleClient};
use crate::error::ApiError;
use crate::schedule::session::{
    Completion, FetchRequest, ScheduleQuery, ScheduleView, ViewSnapshot,
};
use crate::utils::dates::today_local;
use crate::utils::view_cache::ViewRegistry;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Exactly one of: `date` (or nothing, for the latest day), `start_date`
/// with `end_date`, or `last_days`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoadRequest {
    #[schema(example = "2024-06-03", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 7)]
    pub last_days: Option<u32>,
    #[schema(example = 50)]
    pub per_page: Option<u32>,
}

impl LoadRequest {
    pub fn to_query(&self, today: NaiveDate) -> Result<ScheduleQuery, ApiError> {
        match (self.date, self.start_date, self.end_date, self.last_days) {
            (date, None, None, None) => Ok(ScheduleQuery::Day { date }),
            (None, Some(start), Some(end), None) => Ok(ScheduleQuery::range(start, end)?),
            (None, None, None, Some(days)) => Ok(ScheduleQuery::last_days(days, today)?),
            _ => Err(ApiError::BadRequest(
                "Specify either date, start_date with end_date, or last_days".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageRequest {
    #[schema(example = 2)]
    pub page: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PerPageRequest {
    #[schema(example = 100)]
    pub per_page: u32,
}

/// Absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FilterUpdate {
    #[schema(example = "иван")]
    pub search: Option<String>,
    #[schema(example = json!([1, 3]))]
    pub department_ids: Option<Vec<u64>>,
}

/// Performs the fetch without holding the view lock, then hands the result
/// back. A newer fetch started meanwhile makes this one stale.
async fn run_fetch(
    client: &ScheduleClient,
    view: &Mutex<ScheduleView>,
    req: FetchRequest,
) -> Result<(), ApiError> {
    let result = client.fetch_schedule(&req).await;
    let unauthorized = matches!(result, Err(ClientError::Unauthorized));
    let result = result.map_err(|e| {
        warn!(error = %e, ticket = req.ticket.id(), "Schedule fetch failed");
        format!("Ошибка загрузки данных: {e}")
    });

    let completion = view.lock().await.complete(req.ticket, result);
    if unauthorized && completion == Completion::Applied {
        return Err(ClientError::Unauthorized.into());
    }
    Ok(())
}

async fn snapshot_response(session: &ViewSession, view: &Mutex<ScheduleView>) -> HttpResponse {
    let snapshot: ViewSnapshot = view.lock().await.snapshot();
    session.echo(&mut HttpResponse::Ok()).json(snapshot)
}

/// Current state of the caller's schedule view
#[utoipa::path(
    get,
    path = "/api/schedule",
    params(("x-view-session" = Option<String>, Header, description = "View session id; issued when absent")),
    responses(
        (status = 200, description = "View snapshot", body = ViewSnapshot)
    ),
    tag = "Schedule"
)]
pub async fn get_schedule(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    Ok(snapshot_response(&session, &view).await)
}

/// Discard the caller's schedule view
#[utoipa::path(
    delete,
    path = "/api/schedule",
    params(("x-view-session" = String, Header, description = "View session id")),
    responses(
        (status = 204, description = "View closed"),
        (status = 404, description = "No such view")
    ),
    tag = "Schedule"
)]
pub async fn close_view(session: ViewSession, registry: web::Data<ViewRegistry>) -> HttpResponse {
    if registry.close(session.id()).await {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().json(serde_json::json!({ "message": "View session not found" }))
    }
}

/// Load a day or a date range
#[utoipa::path(
    post,
    path = "/api/schedule/load",
    params(("x-view-session" = Option<String>, Header, description = "View session id; issued when absent")),
    request_body = LoadRequest,
    responses(
        (status = 200, description = "Loaded; fetch errors are reported in `error`", body = ViewSnapshot),
        (status = 400, description = "Invalid date selection", body = Object, example = json!({
            "message": "range of 400 days exceeds the 365-day limit"
        })),
        (status = 401, description = "Upstream session expired")
    ),
    tag = "Schedule"
)]
#[instrument(skip_all, fields(session = %session.id()))]
pub async fn load_schedule(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    client: web::Data<ScheduleClient>,
    body: web::Json<LoadRequest>,
) -> Result<HttpResponse, ApiError> {
    let query = body.to_query(today_local())?;
    info!(?query, "Loading schedule");

    let view = registry.view(session.id()).await;
    let req = {
        let mut view = view.lock().await;
        if let Some(per_page) = body.per_page {
            view.set_page_size(per_page);
        }
        view.load(query)
    };
    run_fetch(&client, &view, req).await?;
    Ok(snapshot_response(&session, &view).await)
}

/// Jump to another page of the loaded schedule
#[utoipa::path(
    post,
    path = "/api/schedule/page",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    request_body = PageRequest,
    responses(
        (status = 200, description = "Page loaded", body = ViewSnapshot),
        (status = 400, description = "Page out of range", body = Object, example = json!({
            "message": "page 9 is outside 1..=3"
        })),
        (status = 409, description = "Nothing loaded yet")
    ),
    tag = "Schedule"
)]
#[instrument(skip_all, fields(session = %session.id(), page = body.page))]
pub async fn go_to_page(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    client: web::Data<ScheduleClient>,
    body: web::Json<PageRequest>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    let req = view.lock().await.go_to_page(body.page)?;
    run_fetch(&client, &view, req).await?;
    Ok(snapshot_response(&session, &view).await)
}

/// Change rows per page; returns to page 1
#[utoipa::path(
    post,
    path = "/api/schedule/per-page",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    request_body = PerPageRequest,
    responses(
        (status = 200, description = "Page size applied", body = ViewSnapshot)
    ),
    tag = "Schedule"
)]
pub async fn set_per_page(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    client: web::Data<ScheduleClient>,
    body: web::Json<PerPageRequest>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    let req = view.lock().await.set_per_page(body.per_page);
    if let Some(req) = req {
        run_fetch(&client, &view, req).await?;
    }
    Ok(snapshot_response(&session, &view).await)
}

/// Repeat the last fetch
#[utoipa::path(
    post,
    path = "/api/schedule/retry",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    responses(
        (status = 200, description = "Fetch repeated", body = ViewSnapshot),
        (status = 409, description = "Nothing loaded yet")
    ),
    tag = "Schedule"
)]
pub async fn retry(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    client: web::Data<ScheduleClient>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    let req = view.lock().await.retry()?;
    run_fetch(&client, &view, req).await?;
    Ok(snapshot_response(&session, &view).await)
}

/// Update search text and department selection
#[utoipa::path(
    put,
    path = "/api/schedule/filter",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    request_body = FilterUpdate,
    responses(
        (status = 200, description = "Filter applied", body = ViewSnapshot)
    ),
    tag = "Schedule"
)]
pub async fn update_filter(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    body: web::Json<FilterUpdate>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    {
        let FilterUpdate {
            search,
            department_ids,
        } = body.into_inner();
        let mut view = view.lock().await;
        if let Some(search) = search {
            view.set_search(search);
        }
        if let Some(ids) = department_ids {
            view.set_departments(ids.into_iter().collect::<BTreeSet<_>>());
        }
    }
    Ok(snapshot_response(&session, &view).await)
}

/// Cycle the status sort: none, late first, on time first
#[utoipa::path(
    post,
    path = "/api/schedule/sort",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    responses(
        (status = 200, description = "Sort advanced", body = ViewSnapshot)
    ),
    tag = "Schedule"
)]
pub async fn cycle_sort(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    view.lock().await.cycle_sort();
    Ok(snapshot_response(&session, &view).await)
}

/// Expand or collapse one employee's days in a range view
#[utoipa::path(
    post,
    path = "/api/schedule/expand/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        ("x-view-session" = Option<String>, Header, description = "View session id")
    ),
    responses(
        (status = 200, description = "Expansion toggled", body = ViewSnapshot)
    ),
    tag = "Schedule"
)]
pub async fn toggle_expanded(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    view.lock().await.toggle_expanded(path.into_inner());
    Ok(snapshot_response(&session, &view).await)
}

/// Download the filtered, sorted schedule as a spreadsheet
#[utoipa::path(
    get,
    path = "/api/schedule/export",
    params(("x-view-session" = Option<String>, Header, description = "View session id")),
    responses(
        (status = 200, description = "Spreadsheet", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 422, description = "No rows to export", body = Object, example = json!({
            "message": "Нет данных для экспорта"
        }))
    ),
    tag = "Schedule"
)]
#[instrument(skip_all, fields(session = %session.id()))]
pub async fn export_schedule(
    session: ViewSession,
    registry: web::Data<ViewRegistry>,
) -> Result<HttpResponse, ApiError> {
    let view = registry.view(session.id()).await;
    let file = view.lock().await.export()?;
    info!(file_name = %file.file_name, bytes = file.bytes.len(), "Schedule exported");

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: file.file_name.into_bytes(),
        })],
    };
    Ok(session
        .echo(&mut HttpResponse::Ok())
        .content_type(XLSX_MIME)
        .insert_header(disposition)
        .body(file.bytes))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::view_session::VIEW_SESSION_HEADER;
    use crate::test_support::{TestState, TestUpstream, peer};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[actix_web::test]
    async fn load_request_picks_query_shape() {
        let today = date("2024-06-10");

        assert_eq!(
            LoadRequest::default().to_query(today).unwrap(),
            ScheduleQuery::Day { date: None }
        );
        assert_eq!(
            LoadRequest {
                last_days: Some(7),
                ..Default::default()
            }
            .to_query(today)
            .unwrap(),
            ScheduleQuery::Range {
                start: date("2024-06-04"),
                end: today
            }
        );
        assert!(
            LoadRequest {
                start_date: Some(today),
                ..Default::default()
            }
            .to_query(today)
            .is_err()
        );
        assert!(matches!(
            LoadRequest {
                start_date: Some(date("2024-06-10")),
                end_date: Some(date("2024-06-01")),
                ..Default::default()
            }
            .to_query(today),
            Err(ApiError::Query(_))
        ));
    }

    #[actix_web::test]
    async fn load_day_then_filter_and_sort() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-1"))
            .set_json(json!({}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(VIEW_SESSION_HEADER).unwrap(), "tab-1");
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["query"], json!({"kind": "day", "date": "2024-06-03"}));
        assert_eq!(body["rows"].as_array().unwrap().len(), 3);
        assert_eq!(body["late_count"], 1);

        let req = peer(test::TestRequest::post().uri("/api/schedule/sort"))
            .insert_header((VIEW_SESSION_HEADER, "tab-1"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["filter"]["sort"], "late_first");
        assert_eq!(body["rows"][0]["is_late"], true);

        let req = peer(test::TestRequest::put().uri("/api/schedule/filter"))
            .insert_header((VIEW_SESSION_HEADER, "tab-1"))
            .set_json(json!({"department_ids": [1]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let names: Vec<_> = body["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["full_name"].as_str().unwrap().to_string())
            .collect();
        // Rows without a department stay visible.
        assert_eq!(names, vec!["Абаев А.А.", "Ванеев В.В."]);
    }

    #[actix_web::test]
    async fn range_rows_collapse_until_expanded() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-2"))
            .set_json(json!({"start_date": "2024-06-01", "end_date": "2024-06-02"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"].as_array().unwrap().len(), 2);
        assert_eq!(body["rows"][0]["total_in_group"], 2);

        let req = peer(test::TestRequest::post().uri("/api/schedule/expand/1"))
            .insert_header((VIEW_SESSION_HEADER, "tab-2"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"].as_array().unwrap().len(), 3);
        assert_eq!(body["expanded"], json!([1]));
    }

    #[actix_web::test]
    async fn page_outside_range_is_rejected() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::post().uri("/api/schedule/page"))
            .insert_header((VIEW_SESSION_HEADER, "tab-3"))
            .set_json(json!({"page": 2}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-3"))
            .set_json(json!({"per_page": 2}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["page"]["total_pages"], 2);

        let req = peer(test::TestRequest::post().uri("/api/schedule/page"))
            .insert_header((VIEW_SESSION_HEADER, "tab-3"))
            .set_json(json!({"page": 2}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["page"]["current_page"], 2);

        let req = peer(test::TestRequest::post().uri("/api/schedule/page"))
            .insert_header((VIEW_SESSION_HEADER, "tab-3"))
            .set_json(json!({"page": 3}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn export_requires_rows() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::get().uri("/api/schedule/export"))
            .insert_header((VIEW_SESSION_HEADER, "tab-4"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Нет данных для экспорта");

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-4"))
            .set_json(json!({}))
            .to_request();
        test::call_service(&app, req).await;

        let req = peer(test::TestRequest::get().uri("/api/schedule/export"))
            .insert_header((VIEW_SESSION_HEADER, "tab-4"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("content-type").unwrap(), XLSX_MIME);
        let bytes = test::read_body(res).await;
        assert!(bytes.starts_with(b"PK"));
    }

    #[actix_web::test]
    async fn closed_view_starts_over() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-6"))
            .set_json(json!({}))
            .to_request();
        test::call_service(&app, req).await;

        let req = peer(test::TestRequest::delete().uri("/api/schedule"))
            .insert_header((VIEW_SESSION_HEADER, "tab-6"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = peer(test::TestRequest::get().uri("/api/schedule"))
            .insert_header((VIEW_SESSION_HEADER, "tab-6"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["query"], Value::Null);
        assert_eq!(body["rows"], json!([]));
    }

    #[actix_web::test]
    async fn upstream_failure_is_reported_inline() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        // The fake upstream answers 500 for this date.
        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .insert_header((VIEW_SESSION_HEADER, "tab-5"))
            .set_json(json!({"date": "1999-01-01"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert!(body["error"].as_str().unwrap().starts_with("Ошибка загрузки данных"));
        assert_eq!(body["loading"], false);
    }

    #[actix_web::test]
    async fn expired_token_surfaces_as_unauthorized() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        state.store.set_token("expired".into(), None).unwrap();
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::post().uri("/api/schedule/load"))
            .set_json(json!({}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.store.token(), None);
    }
}
