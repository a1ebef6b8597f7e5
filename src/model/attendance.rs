use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Administrative override that suppressed the lateness check for a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExceptionInfo {
    #[serde(default)]
    pub has_exception: bool,

    #[schema(example = "Командировка")]
    pub reason: String,

    #[serde(rename = "type")]
    #[schema(example = "no_lateness_check")]
    pub kind: String,
}

/// One employee's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeDayRecord {
    #[schema(example = 17)]
    pub employee_id: u64,

    #[schema(example = "Иванов И.И.")]
    pub full_name: String,

    #[serde(default)]
    #[schema(example = "Иванов Иван Иванович", nullable = true)]
    pub full_name_expanded: Option<String>,

    #[serde(default)]
    #[schema(example = 3, nullable = true)]
    pub department_id: Option<u64>,

    #[serde(default)]
    #[schema(nullable = true)]
    pub department_name: Option<String>,

    #[schema(example = "2024-06-03", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[serde(default)]
    #[schema(example = "09:12:44", value_type = Option<String>)]
    pub first_entry: Option<NaiveTime>,

    #[serde(default)]
    #[schema(example = "18:03:10", value_type = Option<String>)]
    pub last_exit: Option<NaiveTime>,

    #[serde(default)]
    pub first_entry_door: Option<String>,

    #[serde(default)]
    pub last_exit_door: Option<String>,

    #[serde(default)]
    pub is_late: bool,

    #[serde(default)]
    #[schema(example = 12)]
    pub late_minutes: i64,

    #[serde(default)]
    #[schema(example = 8.8)]
    pub work_hours: Option<f64>,

    #[serde(default)]
    #[schema(example = "Опоздание")]
    pub status: String,

    #[serde(default)]
    pub exception: Option<ExceptionInfo>,
}

/// Day payload nested inside a range group. Carries no employee fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RangeDay {
    #[schema(example = "2024-06-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub first_entry: Option<NaiveTime>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub last_exit: Option<NaiveTime>,

    #[serde(default)]
    pub first_entry_door: Option<String>,

    #[serde(default)]
    pub last_exit_door: Option<String>,

    #[serde(default)]
    pub is_late: bool,

    #[serde(default)]
    pub late_minutes: i64,

    #[serde(default)]
    pub work_hours: Option<f64>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub exception: Option<ExceptionInfo>,
}

/// All of one employee's days inside a requested date span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeRangeGroup {
    pub employee_id: u64,
    pub full_name: String,

    #[serde(default)]
    pub full_name_expanded: Option<String>,

    #[serde(default)]
    pub department_id: Option<u64>,

    #[serde(default)]
    pub department_name: Option<String>,

    pub days: Vec<RangeDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub employees: Vec<EmployeeDayRecord>,
    pub total_count: u64,
    pub late_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RangeSchedule {
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub employees: Vec<EmployeeRangeGroup>,
    pub total_count: u64,
    pub late_count: u64,
}

/// The two upstream response shapes, tagged by the endpoint that produced
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleFeed {
    Day(DaySchedule),
    Range(RangeSchedule),
}

impl ScheduleFeed {
    pub fn total_count(&self) -> u64 {
        match self {
            ScheduleFeed::Day(day) => day.total_count,
            ScheduleFeed::Range(range) => range.total_count,
        }
    }

    pub fn late_count(&self) -> u64 {
        match self {
            ScheduleFeed::Day(day) => day.late_count,
            ScheduleFeed::Range(range) => range.late_count,
        }
    }
}
