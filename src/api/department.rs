use crate::api::employee::employee_exists;
use crate::errors::AppError;
use crate::model::department::{Department, DepartmentStats, StatusBreakdown};
use crate::utils::query_builder::page_window;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct DepartmentPayload {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Builds things")]
    pub description: String,
    /// employee managing the department
    #[schema(example = 5, nullable = true)]
    #[serde(default)]
    pub manager_id: Option<i64>,
}

impl DepartmentPayload {
    fn validated(self) -> Result<Self, AppError> {
        let name = self.name.trim().to_string();
        let description = self.description.trim().to_string();

        if name.is_empty() {
            return Err(AppError::Validation("name must not be empty".into()));
        }
        if name.chars().count() > 100 {
            return Err(AppError::Validation("name must be at most 100 characters".into()));
        }
        if description.is_empty() {
            return Err(AppError::Validation("description must not be empty".into()));
        }
        if description.chars().count() > 500 {
            return Err(AppError::Validation(
                "description must be at most 500 characters".into(),
            ));
        }

        Ok(Self {
            name,
            description,
            manager_id: self.manager_id,
        })
    }
}

#[derive(Deserialize, IntoParams)]
pub struct DepartmentQuery {
    /// Number of records to skip
    pub skip: Option<i64>,
    /// Maximum number of records to return (1-1000)
    pub limit: Option<i64>,
}

const DEPARTMENT_SELECT: &str = r#"
    SELECT d.id, d.name, d.description, d.manager_id, COUNT(e.id) AS employee_count
    FROM departments d
    LEFT JOIN employees e ON e.department_id = d.id
"#;

pub(crate) async fn fetch_department<'e, E>(
    executor: E,
    department_id: i64,
) -> Result<Option<Department>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{DEPARTMENT_SELECT} WHERE d.id = ? GROUP BY d.id");
    sqlx::query_as::<_, Department>(&sql)
        .bind(department_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn department_exists<'e, E>(
    executor: E,
    department_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

fn not_found(department_id: i64) -> AppError {
    AppError::NotFound(format!("Department with ID {department_id} not found"))
}

async fn ensure_manager(pool: &SqlitePool, manager_id: Option<i64>) -> Result<(), AppError> {
    if let Some(manager_id) = manager_id {
        if !employee_exists(pool, manager_id).await? {
            return Err(AppError::Reference(format!(
                "Employee with ID {manager_id} does not exist"
            )));
        }
    }
    Ok(())
}

/// List departments with their live employee counts
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Departments ordered by id", body = [Department])
    ),
    tag = "Department"
)]
pub async fn list_departments(
    pool: web::Data<SqlitePool>,
    query: web::Query<DepartmentQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_window(query.skip, query.limit);

    let sql = format!("{DEPARTMENT_SELECT} GROUP BY d.id ORDER BY d.id LIMIT ? OFFSET ?");
    debug!(sql = %sql, limit, offset, "Fetching departments");

    let departments = sqlx::query_as::<_, Department>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/{department_id}",
    params(
        ("department_id" = i64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found", body = ErrorBody)
    ),
    tag = "Department"
)]
pub async fn get_department(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = path.into_inner();

    let department = fetch_department(pool.get_ref(), department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;

    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = DepartmentPayload,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid payload, duplicate name or unknown manager", body = ErrorBody)
    ),
    tag = "Department"
)]
pub async fn create_department(
    pool: web::Data<SqlitePool>,
    payload: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner().validated()?;
    ensure_manager(pool.get_ref(), payload.manager_id).await?;

    let mut tx = pool.begin().await?;

    let department_id = sqlx::query(
        r#"
        INSERT INTO departments (name, description, manager_id)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.manager_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::unique_or(
            e,
            format!("Department with name '{}' already exists", payload.name),
        )
    })?
    .last_insert_rowid();

    let department = fetch_department(&mut *tx, department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;

    tx.commit().await?;

    info!(department_id, name = %department.name, "Department created");

    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    put,
    path = "/api/v1/departments/{department_id}",
    params(
        ("department_id" = i64, Path, description = "Department ID")
    ),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Invalid payload, duplicate name or unknown manager", body = ErrorBody),
        (status = 404, description = "Department not found", body = ErrorBody)
    ),
    tag = "Department"
)]
pub async fn update_department(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, AppError> {
    let department_id = path.into_inner();
    let payload = payload.into_inner().validated()?;

    if !department_exists(pool.get_ref(), department_id).await? {
        return Err(not_found(department_id));
    }
    ensure_manager(pool.get_ref(), payload.manager_id).await?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE departments
        SET name = ?, description = ?, manager_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.manager_id)
    .bind(department_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::unique_or(
            e,
            format!("Department with name '{}' already exists", payload.name),
        )
    })?;

    if result.rows_affected() == 0 {
        return Err(not_found(department_id));
    }

    let department = fetch_department(&mut *tx, department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;

    tx.commit().await?;

    info!(department_id, "Department updated");

    Ok(HttpResponse::Ok().json(department))
}

/// Delete a department. Refused while employees still belong to it.
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{department_id}",
    params(
        ("department_id" = i64, Path, description = "Department ID")
    ),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found", body = ErrorBody),
        (status = 409, description = "Department still has employees", body = ErrorBody)
    ),
    tag = "Department"
)]
pub async fn delete_department(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = path.into_inner();

    let department = fetch_department(pool.get_ref(), department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;

    let blocked = || {
        AppError::ReferentialIntegrity(format!(
            "Department {department_id} still has employees. Reassign or remove them first."
        ))
    };

    if department.employee_count > 0 {
        return Err(blocked());
    }

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::dependents_or(e, blocked().to_string()))?;

    if result.rows_affected() == 0 {
        return Err(not_found(department_id));
    }

    info!(department_id, "Department deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/{department_id}/stats",
    params(
        ("department_id" = i64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Aggregates over the department's employees", body = DepartmentStats),
        (status = 404, description = "Department not found", body = ErrorBody)
    ),
    tag = "Department"
)]
pub async fn department_stats(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = path.into_inner();

    let department = fetch_department(pool.get_ref(), department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;

    let breakdown = sqlx::query_as::<_, StatusBreakdown>(
        r#"
        SELECT
            status,
            COUNT(*) AS employees,
            CAST(COALESCE(SUM(salary), 0) AS REAL) AS salary_total
        FROM employees
        WHERE department_id = ?
        GROUP BY status
        "#,
    )
    .bind(department_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(DepartmentStats::from_breakdown(&department, &breakdown)))
}
