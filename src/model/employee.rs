use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Row of the upstream `employees/simple` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 17,
        "full_name": "Иванов И.И.",
        "position": "Инженер",
        "department": "ИТ"
    })
)]
pub struct EmployeeSummary {
    #[schema(example = 17)]
    pub id: u64,

    #[schema(example = "Иванов И.И.")]
    pub full_name: String,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeList {
    pub employees: Vec<EmployeeSummary>,
}

/// Body of the upstream full-name update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullNameUpdate {
    #[serde(skip)]
    pub employee_id: u64,
    pub full_name_expanded: String,
}
