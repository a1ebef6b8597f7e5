use actix_web::{HttpResponse, web};

use crate::client::ScheduleClient;
use crate::error::ApiError;
use crate::model::department::Department;

/// Department vocabulary for the filter, in upstream order
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments", body = [Department]),
        (status = 502, description = "Upstream unavailable", body = Object, example = json!({
            "message": "upstream request failed: connection refused"
        }))
    ),
    tag = "Departments"
)]
pub async fn list_departments(client: web::Data<ScheduleClient>) -> Result<HttpResponse, ApiError> {
    let departments: Vec<Department> = client.departments().await?;
    Ok(HttpResponse::Ok().json(departments))
}
