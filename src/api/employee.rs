use crate::api::department::department_exists;
use crate::errors::AppError;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::utils::query_builder::{FilterBuilder, page_window};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct EmployeePayload {
    #[schema(example = "Ann", value_type = String)]
    pub first_name: String,
    #[schema(example = "Lee", value_type = String)]
    pub last_name: String,
    #[schema(example = "ann.lee@company.com", format = "email", value_type = String)]
    pub email: String,
    #[schema(example = "+15550100", value_type = String)]
    pub phone: String,
    #[schema(example = 1)]
    pub department_id: i64,
    #[schema(example = "Engineer", value_type = String)]
    pub position: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = 90000.0)]
    pub salary: f64,
    /// defaults to `active`
    #[serde(default)]
    pub status: EmployeeStatus,
}

impl EmployeePayload {
    fn validated(self) -> Result<Self, AppError> {
        let required = |field: &str, value: String, max: usize| -> Result<String, AppError> {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(AppError::Validation(format!("{field} must not be empty")));
            }
            if value.chars().count() > max {
                return Err(AppError::Validation(format!(
                    "{field} must be at most {max} characters"
                )));
            }
            Ok(value)
        };

        let email = required("email", self.email, 255)?;
        if !looks_like_email(&email) {
            return Err(AppError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }

        if !self.salary.is_finite() || self.salary < 0.0 {
            return Err(AppError::Validation(
                "salary must be a non-negative number".into(),
            ));
        }

        Ok(Self {
            first_name: required("first_name", self.first_name, 50)?,
            last_name: required("last_name", self.last_name, 50)?,
            email,
            phone: required("phone", self.phone, 20)?,
            department_id: self.department_id,
            position: required("position", self.position, 100)?,
            hire_date: self.hire_date,
            salary: self.salary,
            status: self.status,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Filter by department
    pub department_id: Option<i64>,
    /// Filter by status
    pub status: Option<EmployeeStatus>,
    /// Search by name or email
    pub search: Option<String>,
    /// Number of records to skip
    pub skip: Option<i64>,
    /// Maximum number of records to return (1-1000)
    pub limit: Option<i64>,
}

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, phone, department_id, position, hire_date, salary, status";

pub(crate) async fn fetch_employee<'e, E>(
    executor: E,
    employee_id: i64,
) -> Result<Option<Employee>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn employee_exists<'e, E>(
    executor: E,
    employee_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

fn not_found(employee_id: i64) -> AppError {
    AppError::NotFound(format!("Employee with ID {employee_id} not found"))
}

async fn ensure_department(pool: &SqlitePool, department_id: i64) -> Result<(), AppError> {
    if department_exists(pool, department_id).await? {
        Ok(())
    } else {
        Err(AppError::Reference(format!(
            "Department with ID {department_id} does not exist"
        )))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees ordered by id", body = [Employee]),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    pool: web::Data<SqlitePool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_window(query.skip, query.limit);

    // ---------- build WHERE clause dynamically ----------
    let mut filter = FilterBuilder::new();
    filter
        .eq_i64("department_id", query.department_id)
        .eq_text("status", query.status.as_ref().map(|s| s.as_ref()))
        .search(
            &["first_name", "last_name", "email"],
            query.search.as_deref(),
        );

    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees{} ORDER BY id LIMIT ? OFFSET ?",
        filter.where_clause()
    );
    debug!(sql = %data_sql, ?query, "Fetching employees");

    let employees = filter
        .bind_all(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = i64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| not_found(employee_id))?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = EmployeePayload,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload, duplicate email or unknown department", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    pool: web::Data<SqlitePool>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner().validated()?;
    ensure_department(pool.get_ref(), payload.department_id).await?;

    let mut tx = pool.begin().await?;

    let employee_id = sqlx::query(
        r#"
        INSERT INTO employees
        (first_name, last_name, email, phone, department_id, position, hire_date, salary, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.department_id)
    .bind(&payload.position)
    .bind(payload.hire_date)
    .bind(payload.salary)
    .bind(payload.status)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::unique_or(
            e,
            format!("Employee with email '{}' already exists", payload.email),
        )
    })?
    .last_insert_rowid();

    let employee = fetch_employee(&mut *tx, employee_id)
        .await?
        .ok_or_else(|| not_found(employee_id))?;

    tx.commit().await?;

    info!(employee_id, department_id = employee.department_id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// Update Employee, replacing every mutable field
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = i64, Path, description = "Employee ID")
    ),
    request_body = EmployeePayload,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid payload, duplicate email or unknown department", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner().validated()?;

    if !employee_exists(pool.get_ref(), employee_id).await? {
        return Err(not_found(employee_id));
    }
    ensure_department(pool.get_ref(), payload.department_id).await?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE employees
        SET first_name = ?, last_name = ?, email = ?, phone = ?, department_id = ?,
            position = ?, hire_date = ?, salary = ?, status = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.department_id)
    .bind(&payload.position)
    .bind(payload.hire_date)
    .bind(payload.salary)
    .bind(payload.status)
    .bind(employee_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::unique_or(
            e,
            format!("Employee with email '{}' already exists", payload.email),
        )
    })?;

    if result.rows_affected() == 0 {
        return Err(not_found(employee_id));
    }

    let employee = fetch_employee(&mut *tx, employee_id)
        .await?
        .ok_or_else(|| not_found(employee_id))?;

    tx.commit().await?;

    info!(employee_id, "Employee updated");

    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
///
/// Refused while the employee has leave requests of their own. References to the
/// employee as approver or department manager are cleared in the same transaction.
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = i64, Path, description = "Employee ID")
    ),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 404, description = "Employee not found", body = ErrorBody),
        (status = 409, description = "Employee still has leave history", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();

    if !employee_exists(pool.get_ref(), employee_id).await? {
        return Err(not_found(employee_id));
    }

    let blocked = || {
        AppError::ReferentialIntegrity(format!(
            "Employee {employee_id} has leave requests and cannot be deleted"
        ))
    };

    let leave_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await?;
    if leave_count > 0 {
        return Err(blocked());
    }

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE leave_requests SET approved_by = NULL WHERE approved_by = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE departments SET manager_id = NULL WHERE manager_id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::dependents_or(e, blocked().to_string()))?;

    if result.rows_affected() == 0 {
        return Err(not_found(employee_id));
    }

    tx.commit().await?;

    info!(employee_id, "Employee deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/department/{department_id}/employees",
    params(
        ("department_id" = i64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Employees of the department ordered by id", body = [Employee]),
        (status = 404, description = "Department not found", body = ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn list_department_employees(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = path.into_inner();

    if !department_exists(pool.get_ref(), department_id).await? {
        return Err(AppError::NotFound(format!(
            "Department with ID {department_id} not found"
        )));
    }

    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department_id = ? ORDER BY id");
    let employees = sqlx::query_as::<_, Employee>(&sql)
        .bind(department_id)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(employees))
}
