use crate::api::department::DepartmentPayload;
use crate::api::employee::EmployeePayload;
use crate::api::leave_request::{CreateLeave, LeaveApproval, LeaveFilter, UpdateLeave};
use crate::errors::ErrorBody;
use crate::model::department::{Department, DepartmentStats, StatusCounts};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveSummary, LeaveType, LeaveTypeUsage};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS API",
        version = "0.1.0",
        description = r#"
## Human Resource Management (HRM) System

Record keeping for **departments**, **employees** and **leave requests**.

### 🔹 Key Features
- **Department Management**
  - Create, update, list, delete departments; live employee counts and salary statistics
- **Employee Management**
  - Create, update, list, search and delete employee profiles
- **Leave Management**
  - Submit, edit and cancel pending requests, approve or reject them exactly once,
    and summarise approved days per leave type

### 📦 Response Format
- JSON request and response bodies
- Errors: `{"error": "<CODE>", "message": "..."}` with codes
  `VALIDATION_ERROR`, `REFERENCE_ERROR`, `NOT_FOUND`, `INVALID_STATE_TRANSITION`,
  `REFERENTIAL_INTEGRITY`, `INTERNAL_ERROR`
- List endpoints accept `skip` and `limit`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::health::index,
        crate::api::health::health,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,
        crate::api::department::department_stats,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::list_department_employees,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::employee_leave_summary
    ),
    components(
        schemas(
            ErrorBody,
            Department,
            DepartmentPayload,
            DepartmentStats,
            StatusCounts,
            Employee,
            EmployeePayload,
            EmployeeStatus,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            LeaveFilter,
            CreateLeave,
            UpdateLeave,
            LeaveApproval,
            LeaveSummary,
            LeaveTypeUsage
        )
    ),
    tags(
        (name = "Department", description = "Department management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave request and approval APIs"),
        (name = "System", description = "Service banner and health probe"),
    )
)]
pub struct ApiDoc;
