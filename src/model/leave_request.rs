use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum LeaveType {
    Vacation,
    Sick,
    Personal,
    Unpaid,
    Maternity,
    Paternity,
}

#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Outcome of the approval operation.
    pub fn from_decision(approved: bool) -> Self {
        if approved {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Rejected
        }
    }

    /// Only `pending` ever moves, and only to a terminal state.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (
                LeaveStatus::Pending,
                LeaveStatus::Approved | LeaveStatus::Rejected | LeaveStatus::Cancelled
            )
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 3,
    "leave_type": "vacation",
    "start_date": "2024-12-20",
    "end_date": "2024-12-31",
    "reason": "Year-end vacation",
    "status": "pending",
    "approved_by": null,
    "comments": null,
    "created_at": "2024-12-01"
}))]
pub struct LeaveRequest {
    #[schema(example = 1)]
    /// leave application id
    pub id: i64,
    /// employee id for whom the leave is applied
    #[schema(example = 3)]
    pub employee_id: i64,
    pub leave_type: LeaveType,
    #[schema(example = "2024-12-20", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-12-31", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Year-end vacation")]
    pub reason: String,
    pub status: LeaveStatus,
    /// employee who decided the request
    #[schema(example = 5, nullable = true)]
    pub approved_by: Option<i64>,
    #[schema(nullable = true)]
    pub comments: Option<String>,
    #[schema(example = "2024-12-01", format = "date", value_type = String)]
    pub created_at: NaiveDate,
}

/// One `GROUP BY leave_type, status` bucket of an employee's requests.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveTally {
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub requests: i64,
    /// inclusive calendar days
    pub days: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LeaveTypeUsage {
    /// approved requests of this type
    pub count: i64,
    /// approved calendar days of this type
    pub days: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1,
    "total_requests": 3,
    "pending": 1,
    "approved": 1,
    "rejected": 1,
    "cancelled": 0,
    "by_type": {
        "vacation": { "count": 1, "days": 5 },
        "sick": { "count": 0, "days": 0 },
        "personal": { "count": 0, "days": 0 },
        "unpaid": { "count": 0, "days": 0 },
        "maternity": { "count": 0, "days": 0 },
        "paternity": { "count": 0, "days": 0 }
    },
    "total_approved_days": 5
}))]
pub struct LeaveSummary {
    pub employee_id: i64,
    pub total_requests: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub cancelled: i64,
    /// approved usage per leave type; every type is present
    pub by_type: BTreeMap<String, LeaveTypeUsage>,
    pub total_approved_days: i64,
}

impl LeaveSummary {
    pub fn from_tallies(employee_id: i64, tallies: &[LeaveTally]) -> Self {
        let requests_in = |status: LeaveStatus| {
            tallies
                .iter()
                .filter(|t| t.status == status)
                .map(|t| t.requests)
                .sum::<i64>()
        };

        let mut by_type: BTreeMap<String, LeaveTypeUsage> = LeaveType::iter()
            .map(|kind| (kind.to_string(), LeaveTypeUsage::default()))
            .collect();

        for tally in tallies.iter().filter(|t| t.status == LeaveStatus::Approved) {
            let usage = by_type.entry(tally.leave_type.to_string()).or_default();
            usage.count += tally.requests;
            usage.days += tally.days;
        }

        Self {
            employee_id,
            total_requests: tallies.iter().map(|t| t.requests).sum(),
            pending: requests_in(LeaveStatus::Pending),
            approved: requests_in(LeaveStatus::Approved),
            rejected: requests_in(LeaveStatus::Rejected),
            cancelled: requests_in(LeaveStatus::Cancelled),
            total_approved_days: by_type.values().map(|u| u.days).sum(),
            by_type,
        }
    }
}
