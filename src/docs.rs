use crate::api::names::{ApplyReport, NameLists};
use crate::api::schedule::{FilterUpdate, LoadRequest, PageRequest, PerPageRequest};
use crate::api::session::{InstructionStatus, SessionInfo, TokenRequest};
use crate::model::attendance::{EmployeeDayRecord, ExceptionInfo};
use crate::model::department::Department;
use crate::model::health::HealthSample;
use crate::schedule::names::{NameMapping, NameMatchReport};
use crate::schedule::pagination::PageInfo;
use crate::schedule::session::{ScheduleQuery, ViewSnapshot};
use crate::schedule::view::{FilterState, FlatDisplayRow, StatusSort};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SKUD Schedule API",
        version = "0.1.0",
        description = r#"
## Employee attendance schedule

View service over the SKUD access-control attendance API. Each caller keeps its own
schedule view (date or date range, search, department filter, status sort, expanded
employees, page) identified by the `X-View-Session` header.

### Features
- **Schedule**
  - Single day or up to 365-day ranges, server-side pagination
  - Search, department filter, three-state status sort
  - Per-employee grouping of range rows with expand/collapse
  - Spreadsheet export of exactly what is on screen
- **Names**
  - Match abbreviated names (`Иванов И.И.`) to full names and store them upstream
- **Session**
  - Upstream bearer token and first-visit instruction flags
- **Health**
  - Periodic upstream health samples

### Response Format
- JSON bodies; errors are `{ "message": ... }`
"#,
    ),
    paths(
        crate::api::schedule::get_schedule,
        crate::api::schedule::close_view,
        crate::api::schedule::load_schedule,
        crate::api::schedule::go_to_page,
        crate::api::schedule::set_per_page,
        crate::api::schedule::retry,
        crate::api::schedule::update_filter,
        crate::api::schedule::cycle_sort,
        crate::api::schedule::toggle_expanded,
        crate::api::schedule::export_schedule,

        crate::api::departments::list_departments,

        crate::api::names::match_names,
        crate::api::names::apply_names,

        crate::api::session::session_info,
        crate::api::session::set_token,
        crate::api::session::clear_token,
        crate::api::session::instruction_status,
        crate::api::session::mark_instruction_seen,

        crate::api::health::health_log
    ),
    components(
        schemas(
            LoadRequest,
            PageRequest,
            PerPageRequest,
            FilterUpdate,
            ScheduleQuery,
            ViewSnapshot,
            FlatDisplayRow,
            EmployeeDayRecord,
            ExceptionInfo,
            FilterState,
            StatusSort,
            PageInfo,
            Department,
            NameLists,
            NameMapping,
            NameMatchReport,
            ApplyReport,
            SessionInfo,
            TokenRequest,
            InstructionStatus,
            HealthSample
        )
    ),
    tags(
        (name = "Schedule", description = "Attendance schedule view APIs"),
        (name = "Departments", description = "Department vocabulary"),
        (name = "Names", description = "Full name reconciliation"),
        (name = "Session", description = "Stored credentials and UI flags"),
        (name = "Health", description = "Upstream health history"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/schedule",
            "/api/schedule/load",
            "/api/schedule/export",
            "/api/departments",
            "/api/names/apply",
            "/api/session/instructions/{key}/seen",
            "/api/health/log",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
