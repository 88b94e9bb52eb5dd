use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    OnLeave,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+1234567890",
        "department_id": 1,
        "position": "Software Engineer",
        "hire_date": "2024-01-15",
        "salary": 75000.0,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+1234567890")]
    pub phone: String,

    #[schema(example = 1)]
    pub department_id: i64,

    #[schema(example = "Software Engineer")]
    pub position: String,

    #[schema(
        example = "2024-01-15",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = 75000.0)]
    pub salary: f64,

    pub status: EmployeeStatus,
}
