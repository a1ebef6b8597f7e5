//! Shared test fixtures: an in-process fake of the upstream attendance API
//! and a fully wired application state pointing at it.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::test::TestRequest;
use actix_web::web::{self, Data};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use serde::Deserialize;
use serde_json::json;

use crate::client::ScheduleClient;
use crate::config::Config;
use crate::routes::{self, Limiters};
use crate::utils::health_log::HealthLog;
use crate::utils::session_store::SessionStore;
use crate::utils::view_cache::ViewRegistry;

pub fn temp_store() -> Arc<SessionStore> {
    let dir = std::env::temp_dir().join(format!("skud-schedule-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    Arc::new(SessionStore::load(dir.join("session.json")).unwrap())
}

pub fn test_config(upstream_url: &str) -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        upstream_url: upstream_url.to_string(),
        upstream_timeout: Duration::from_secs(5),
        session_store_path: "session.json".to_string(),
        default_per_page: 50,
        view_session_ttl: Duration::from_secs(60),
        max_view_sessions: 100,
        health_poll_interval: Duration::from_secs(30),
        health_log_capacity: 10,
        name_update_concurrency: 2,
        rate_view_per_min: 6000,
        rate_export_per_min: 600,
        api_prefix: "/api".to_string(),
    }
}

/// Governor keys on the peer address, which test requests lack by default.
pub fn peer(req: TestRequest) -> TestRequest {
    req.peer_addr("127.0.0.1:40000".parse().unwrap())
}

pub struct TestState {
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub client: Arc<ScheduleClient>,
    pub registry: ViewRegistry,
    pub health: Arc<HealthLog>,
    limiters: Limiters,
}

impl TestState {
    pub fn new(upstream: &TestUpstream) -> Self {
        let config = test_config(&upstream.url);
        let store = temp_store();
        let client = Arc::new(upstream.client(store.clone()));
        Self {
            registry: ViewRegistry::new(
                config.max_view_sessions,
                config.view_session_ttl,
                config.default_per_page,
            ),
            health: Arc::new(HealthLog::new(config.health_log_capacity)),
            limiters: Limiters::new(&config).unwrap(),
            config,
            store,
            client,
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(Data::new(self.config.clone()))
            .app_data(Data::from(self.store.clone()))
            .app_data(Data::from(self.client.clone()))
            .app_data(Data::new(self.registry.clone()))
            .app_data(Data::from(self.health.clone()));
        routes::configure(cfg, &self.config, self.limiters.clone());
    }
}

pub struct TestUpstream {
    pub url: String,
}

impl TestUpstream {
    /// Binds an ephemeral port and serves the fake API on the current
    /// actix system.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(|| App::new().configure(fake_routes))
            .workers(1)
            .disable_signals()
            .listen(listener)
            .unwrap()
            .run();
        actix_web::rt::spawn(server);
        Self {
            url: format!("http://{addr}"),
        }
    }

    pub fn client(&self, store: Arc<SessionStore>) -> ScheduleClient {
        ScheduleClient::new(&self.url, Duration::from_secs(5), store).unwrap()
    }
}

fn fake_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/employee-schedule", web::get().to(fake_day))
        .route("/employee-schedule-range", web::get().to(fake_range))
        .route("/departments", web::get().to(fake_departments))
        .route("/employees/simple", web::get().to(fake_employees))
        .route("/employees/{id}/full-name", web::put().to(fake_update_name))
        .route("/health", web::get().to(fake_health));
}

fn rejected(req: &HttpRequest) -> Option<HttpResponse> {
    let expired = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == "Bearer expired");
    expired.then(|| HttpResponse::Unauthorized().json(json!({"detail": "Token expired"})))
}

#[derive(Deserialize)]
struct DayParams {
    date: Option<String>,
}

async fn fake_day(req: HttpRequest, params: web::Query<DayParams>) -> HttpResponse {
    if let Some(res) = rejected(&req) {
        return res;
    }
    let date = params.date.clone().unwrap_or_else(|| "2024-06-03".to_string());
    if date == "1999-01-01" {
        return HttpResponse::InternalServerError().body("database unavailable");
    }
    HttpResponse::Ok().json(json!({
        "date": date,
        "employees": [
            {
                "employee_id": 1, "full_name": "Абаев А.А.",
                "department_id": 1, "department_name": "Бухгалтерия",
                "first_entry": "08:45:00", "last_exit": "18:00:00",
                "is_late": false, "late_minutes": 0, "work_hours": 9.3,
                "status": "Вовремя", "exception": null
            },
            {
                "employee_id": 2, "full_name": "Борисов Б.Б.",
                "department_id": 2, "department_name": "ИТ",
                "first_entry": "09:20:00", "last_exit": null,
                "is_late": true, "late_minutes": 20, "work_hours": null,
                "status": "Опоздание", "exception": null
            },
            {
                "employee_id": 3, "full_name": "Ванеев В.В.",
                "department_id": null, "department_name": null,
                "first_entry": "08:55:00", "last_exit": "17:30:00",
                "is_late": false, "late_minutes": 0, "work_hours": 8.6,
                "status": "Вовремя",
                "exception": {"has_exception": true, "reason": "Командировка", "type": "no_lateness_check"}
            }
        ],
        "total_count": 3,
        "late_count": 1,
        "page": 1,
        "per_page": 50,
        "total_pages": 1
    }))
}

#[derive(Deserialize)]
struct RangeParams {
    start_date: String,
    end_date: String,
}

async fn fake_range(req: HttpRequest, params: web::Query<RangeParams>) -> HttpResponse {
    if let Some(res) = rejected(&req) {
        return res;
    }
    let day = |date: &str, late: bool| {
        json!({
            "date": date,
            "first_entry": if late { "09:30:00" } else { "08:50:00" },
            "last_exit": "18:00:00",
            "is_late": late,
            "late_minutes": if late { 30 } else { 0 },
            "work_hours": if late { 8.5 } else { 9.2 },
            "status": if late { "Опоздание" } else { "Вовремя" },
            "exception": null
        })
    };
    HttpResponse::Ok().json(json!({
        "start_date": params.start_date,
        "end_date": params.end_date,
        "employees": [
            {
                "employee_id": 1, "full_name": "Абаев А.А.",
                "department_id": 1, "department_name": "Бухгалтерия",
                "days": [day(&params.start_date, false), day(&params.end_date, true)]
            },
            {
                "employee_id": 2, "full_name": "Борисов Б.Б.",
                "department_id": 2, "department_name": "ИТ",
                "days": [day(&params.start_date, false)]
            }
        ],
        "total_count": 2,
        "late_count": 1
    }))
}

async fn fake_departments(req: HttpRequest) -> HttpResponse {
    if let Some(res) = rejected(&req) {
        return res;
    }
    HttpResponse::Ok().json(json!([
        {"id": 1, "name": "Бухгалтерия", "priority": 1, "employee_count": 1},
        {"id": 2, "name": "ИТ", "priority": 2, "employee_count": 1}
    ]))
}

async fn fake_employees(req: HttpRequest) -> HttpResponse {
    if let Some(res) = rejected(&req) {
        return res;
    }
    HttpResponse::Ok().json(json!({
        "employees": [
            {"id": 1, "full_name": "Абаев А.А.", "position": "Бухгалтер", "department": "Бухгалтерия"},
            {"id": 2, "full_name": "Борисов Б.Б.", "position": "Инженер", "department": "ИТ"},
            {"id": 3, "full_name": "Ванеев В.В.", "position": null, "department": null},
            {"id": 404, "full_name": "Призрак П.П.", "position": null, "department": null}
        ]
    }))
}

async fn fake_update_name(req: HttpRequest, path: web::Path<u64>) -> HttpResponse {
    if let Some(res) = rejected(&req) {
        return res;
    }
    match path.into_inner() {
        404 => HttpResponse::NotFound().json(json!({"detail": "Employee not found"})),
        3 => HttpResponse::InternalServerError().body("update failed"),
        _ => HttpResponse::Ok().json(json!({"success": true})),
    }
}

async fn fake_health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "data": {
            "total_records": 1234,
            "total_employees": 4,
            "last_data_date": "2024-06-03"
        }
    }))
}
