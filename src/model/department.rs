use crate::model::employee::EmployeeStatus;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Engineering",
        "description": "Software development and engineering team",
        "manager_id": 5,
        "employee_count": 15
    })
)]
pub struct Department {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Engineering")]
    pub name: String,

    #[schema(example = "Software development and engineering team")]
    pub description: String,

    #[schema(example = 5, nullable = true)]
    pub manager_id: Option<i64>,

    /// Employees currently referencing this department, counted at read time
    #[schema(example = 15)]
    pub employee_count: i64,
}

/// Head count and salary of one employee status inside a department.
#[derive(Debug, sqlx::FromRow)]
pub struct StatusBreakdown {
    pub status: EmployeeStatus,
    pub employees: i64,
    pub salary_total: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub active: i64,
    pub inactive: i64,
    pub on_leave: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "department_id": 1,
        "department_name": "Engineering",
        "manager_id": 5,
        "total_employees": 3,
        "active_employees": 2,
        "by_status": { "active": 2, "inactive": 0, "on_leave": 1 },
        "total_salary_expense": 255000.0,
        "average_salary": 85000.0
    })
)]
pub struct DepartmentStats {
    pub department_id: i64,
    pub department_name: String,
    pub manager_id: Option<i64>,
    pub total_employees: i64,
    pub active_employees: i64,
    pub by_status: StatusCounts,
    pub total_salary_expense: f64,
    /// rounded to cents, 0 for an empty department
    pub average_salary: f64,
}

impl DepartmentStats {
    pub fn from_breakdown(department: &Department, rows: &[StatusBreakdown]) -> Self {
        let count_of = |status: EmployeeStatus| {
            rows.iter()
                .filter(|row| row.status == status)
                .map(|row| row.employees)
                .sum::<i64>()
        };

        let total_employees: i64 = EmployeeStatus::iter().map(count_of).sum();
        let total_salary_expense: f64 = rows.iter().map(|row| row.salary_total).sum();
        let average_salary = if total_employees == 0 {
            0.0
        } else {
            (total_salary_expense / total_employees as f64 * 100.0).round() / 100.0
        };

        Self {
            department_id: department.id,
            department_name: department.name.clone(),
            manager_id: department.manager_id,
            total_employees,
            active_employees: count_of(EmployeeStatus::Active),
            by_status: StatusCounts {
                active: count_of(EmployeeStatus::Active),
                inactive: count_of(EmployeeStatus::Inactive),
                on_leave: count_of(EmployeeStatus::OnLeave),
            },
            total_salary_expense,
            average_salary,
        }
    }
}
