use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Department {
    #[schema(example = 3)]
    pub id: u64,

    #[schema(example = "Бухгалтерия")]
    pub name: String,

    #[serde(default)]
    #[schema(nullable = true)]
    pub priority: Option<i32>,

    #[serde(default)]
    #[schema(nullable = true)]
    pub employee_count: Option<u64>,
}
