use crate::api::employee::employee_exists;
use crate::errors::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveSummary, LeaveTally, LeaveType};
use crate::utils::query_builder::{FilterBuilder, page_window};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = 1)]
    pub employee_id: i64,
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "trip")]
    pub reason: String,
}

/// Replacement for the editable fields of a pending request
#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = "personal")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "shorter trip")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveApproval {
    /// true approves, false rejects
    #[schema(example = true)]
    pub approved: bool,
    /// employee deciding the request
    #[schema(example = 1)]
    pub approved_by: i64,
    #[schema(example = "ok", nullable = true)]
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<i64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = "sick")]
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Number of records to skip
    pub skip: Option<i64>,
    /// Maximum number of records to return (1-1000)
    pub limit: Option<i64>,
}

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, status, approved_by, comments, created_at";

pub(crate) async fn fetch_leave<'e, E>(
    executor: E,
    leave_id: i64,
) -> Result<Option<LeaveRequest>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(executor)
        .await
}

fn not_found(leave_id: i64) -> AppError {
    AppError::NotFound(format!("Leave request with ID {leave_id} not found"))
}

fn not_pending(leave_id: i64, status: LeaveStatus, action: &str) -> AppError {
    AppError::InvalidStateTransition(format!(
        "Cannot {action} leave request {leave_id} with status '{status}'. Only pending requests can change."
    ))
}

/// Explains why a `... AND status = 'pending'` write touched no row.
async fn transition_failure(pool: &SqlitePool, leave_id: i64, action: &str) -> AppError {
    match fetch_leave(pool, leave_id).await {
        Ok(Some(current)) => not_pending(leave_id, current.status, action),
        Ok(None) => not_found(leave_id),
        Err(e) => e.into(),
    }
}

fn validate_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), AppError> {
    if end_date < start_date {
        return Err(AppError::Validation(
            "End date must be greater than or equal to start date".into(),
        ));
    }
    Ok(())
}

fn validate_reason(reason: &str) -> Result<String, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("reason must not be empty".into()));
    }
    if reason.chars().count() > 500 {
        return Err(AppError::Validation("reason must be at most 500 characters".into()));
    }
    Ok(reason.to_string())
}

/// Another pending or approved request of the same employee whose inclusive range
/// intersects. Binds: employee_id, end_date, start_date, excluded id.
const OVERLAP_EXISTS: &str = r#"
    EXISTS (
        SELECT 1
        FROM leave_requests other
        WHERE other.employee_id = ?
          AND other.status IN ('pending', 'approved')
          AND other.start_date <= ?
          AND other.end_date >= ?
          AND other.id <> ?
    )
"#;

async fn find_overlap(
    pool: &SqlitePool,
    employee_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM leave_requests
        WHERE employee_id = ?
          AND status IN ('pending', 'approved')
          AND start_date <= ?
          AND end_date >= ?
          AND id <> ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(end_date)
    .bind(start_date)
    .bind(exclude_id.unwrap_or(0))
    .fetch_optional(pool)
    .await
}

async fn ensure_no_overlap(
    pool: &SqlitePool,
    employee_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    match find_overlap(pool, employee_id, start_date, end_date, exclude_id).await? {
        Some(existing) => Err(overlapping(Some(existing))),
        None => Ok(()),
    }
}

fn overlapping(existing: Option<i64>) -> AppError {
    match existing {
        Some(existing) => AppError::Validation(format!(
            "Leave request overlaps with existing leave request (ID: {existing})"
        )),
        None => AppError::Validation("Leave request overlaps with another leave request".into()),
    }
}

/// Explains why the guarded update of a pending request touched no row.
async fn update_failure(pool: &SqlitePool, leave_id: i64, payload: &UpdateLeave) -> AppError {
    let current = match fetch_leave(pool, leave_id).await {
        Ok(Some(current)) => current,
        Ok(None) => return not_found(leave_id),
        Err(e) => return e.into(),
    };
    if current.status != LeaveStatus::Pending {
        return not_pending(leave_id, current.status, "update");
    }
    match find_overlap(
        pool,
        current.employee_id,
        payload.start_date,
        payload.end_date,
        Some(leave_id),
    )
    .await
    {
        Ok(existing) => overlapping(existing),
        Err(e) => e.into(),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests ordered by id", body = [LeaveRequest]),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    pool: web::Data<SqlitePool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_window(query.skip, query.limit);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut filter = FilterBuilder::new();
    filter
        .eq_i64("employee_id", query.employee_id)
        .eq_text("status", query.status.as_ref().map(|s| s.as_ref()))
        .eq_text("leave_type", query.leave_type.as_ref().map(|t| t.as_ref()));

    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{} ORDER BY id LIMIT ? OFFSET ?",
        filter.where_clause()
    );
    debug!(sql = %data_sql, ?query, "Fetching leave list");

    let leaves = filter
        .bind_all(sqlx::query_as::<_, LeaveRequest>(&data_sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(leaves))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leaves/{leave_id}",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 404, description = "Leave request not found", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave_id = path.into_inner();

    let leave = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leaves",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted as pending", body = LeaveRequest),
        (status = 400, description = "Invalid dates, overlapping request or unknown employee", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();

    // 1️⃣ validate dates and reason
    validate_dates(payload.start_date, payload.end_date)?;
    let reason = validate_reason(&payload.reason)?;

    // 2️⃣ employee must exist
    if !employee_exists(pool.get_ref(), payload.employee_id).await? {
        return Err(AppError::Reference(format!(
            "Employee with ID {} does not exist",
            payload.employee_id
        )));
    }

    // 3️⃣ no overlapping pending/approved leave
    ensure_no_overlap(
        pool.get_ref(),
        payload.employee_id,
        payload.start_date,
        payload.end_date,
        None,
    )
    .await?;

    // 4️⃣ insert request, unless an overlapping one was committed meanwhile
    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, reason, status, created_at)
        SELECT ?, ?, ?, ?, ?, ?, ?
        WHERE NOT {OVERLAP_EXISTS}
        "#
    );
    let result = sqlx::query(&sql)
        .bind(payload.employee_id)
        .bind(payload.leave_type)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(&reason)
        .bind(LeaveStatus::Pending)
        .bind(Utc::now().date_naive())
        .bind(payload.employee_id)
        .bind(payload.end_date)
        .bind(payload.start_date)
        .bind(0_i64)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        warn!(employee_id = payload.employee_id, "Overlapping leave request submitted concurrently");
        let existing = find_overlap(
            pool.get_ref(),
            payload.employee_id,
            payload.start_date,
            payload.end_date,
            None,
        )
        .await?;
        return Err(overlapping(existing));
    }
    let leave_id = result.last_insert_rowid();

    let leave = fetch_leave(&mut *tx, leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    tx.commit().await?;

    info!(leave_id, employee_id = leave.employee_id, leave_type = %leave.leave_type, "Leave request submitted");

    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Update pending leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to update")
    ),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Invalid dates or overlapping request", body = ErrorBody),
        (status = 404, description = "Leave request not found", body = ErrorBody),
        (status = 409, description = "Leave request is no longer pending", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn update_leave(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateLeave>,
) -> Result<HttpResponse, AppError> {
    let leave_id = path.into_inner();
    let payload = payload.into_inner();

    let current = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    if current.status != LeaveStatus::Pending {
        return Err(not_pending(leave_id, current.status, "update"));
    }

    validate_dates(payload.start_date, payload.end_date)?;
    let reason = validate_reason(&payload.reason)?;
    ensure_no_overlap(
        pool.get_ref(),
        current.employee_id,
        payload.start_date,
        payload.end_date,
        Some(leave_id),
    )
    .await?;

    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        UPDATE leave_requests
        SET leave_type = ?, start_date = ?, end_date = ?, reason = ?
        WHERE id = ?
        AND status = 'pending'
        AND NOT {OVERLAP_EXISTS}
        "#
    );
    let result = sqlx::query(&sql)
        .bind(payload.leave_type)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(&reason)
        .bind(leave_id)
        .bind(current.employee_id)
        .bind(payload.end_date)
        .bind(payload.start_date)
        .bind(leave_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(update_failure(pool.get_ref(), leave_id, &payload).await);
    }

    let leave = fetch_leave(&mut *tx, leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    tx.commit().await?;

    info!(leave_id, "Leave request updated");

    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Approve or reject leave
========================= */
/// Resolve a pending leave request. A request is decided exactly once.
#[utoipa::path(
    post,
    path = "/api/v1/leaves/{leave_id}/approve",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to decide")
    ),
    request_body = LeaveApproval,
    responses(
        (status = 200, description = "Leave request approved or rejected", body = LeaveRequest),
        (status = 400, description = "Unknown approver", body = ErrorBody),
        (status = 404, description = "Leave request not found", body = ErrorBody),
        (status = 409, description = "Leave request already processed", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<LeaveApproval>,
) -> Result<HttpResponse, AppError> {
    let leave_id = path.into_inner();
    let approval = payload.into_inner();

    let comments = approval
        .comments
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comments.as_ref().is_some_and(|c| c.chars().count() > 500) {
        return Err(AppError::Validation(
            "comments must be at most 500 characters".into(),
        ));
    }

    let current = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    let next = LeaveStatus::from_decision(approval.approved);
    if !current.status.can_transition_to(next) {
        return Err(not_pending(leave_id, current.status, "approve"));
    }

    if !employee_exists(pool.get_ref(), approval.approved_by).await? {
        return Err(AppError::Reference(format!(
            "Approver employee with ID {} does not exist",
            approval.approved_by
        )));
    }

    let mut tx = pool.begin().await?;

    // the status guard makes concurrent decisions race safely: one row update wins
    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approved_by = ?, comments = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(next)
    .bind(approval.approved_by)
    .bind(&comments)
    .bind(leave_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        warn!(leave_id, "Leave request was decided concurrently");
        return Err(transition_failure(pool.get_ref(), leave_id, "approve").await);
    }

    let leave = fetch_leave(&mut *tx, leave_id)
        .await?
        .ok_or_else(|| not_found(leave_id))?;

    tx.commit().await?;

    info!(leave_id, status = %leave.status, approved_by = approval.approved_by, "Leave request decided");

    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Cancel pending leave
========================= */
/// Cancel a pending leave request. The row stays with status `cancelled`.
#[utoipa::path(
    delete,
    path = "/api/v1/leaves/{leave_id}",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 204, description = "Leave request cancelled"),
        (status = 404, description = "Leave request not found", body = ErrorBody),
        (status = 409, description = "Leave request is no longer pending", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(LeaveStatus::Cancelled)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(transition_failure(pool.get_ref(), leave_id, "cancel").await);
    }

    info!(leave_id, "Leave request cancelled");

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/leaves/employee/{employee_id}/summary",
    params(
        ("employee_id" = i64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Request counts per status and approved usage per type", body = LeaveSummary),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Leave"
)]
pub async fn employee_leave_summary(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();

    if !employee_exists(pool.get_ref(), employee_id).await? {
        return Err(AppError::NotFound(format!(
            "Employee with ID {employee_id} not found"
        )));
    }

    let tallies = sqlx::query_as::<_, LeaveTally>(
        r#"
        SELECT
            leave_type,
            status,
            COUNT(*) AS requests,
            CAST(SUM(julianday(end_date) - julianday(start_date) + 1) AS INTEGER) AS days
        FROM leave_requests
        WHERE employee_id = ?
        GROUP BY leave_type, status
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(LeaveSummary::from_tallies(employee_id, &tallies)))
}
