use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::model::employee::EmployeeStatus;
use crate::model::leave_request::{LeaveStatus, LeaveType};

const DEPARTMENTS: [(&str, &str); 4] = [
    ("Engineering", "Software development and engineering team"),
    ("Human Resources", "HR and talent management"),
    ("Sales", "Sales and business development"),
    ("Marketing", "Marketing and communications"),
];

struct SampleEmployee {
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
    phone: &'static str,
    department: usize,
    position: &'static str,
    hire_date: (i32, u32, u32),
    salary: f64,
}

const EMPLOYEES: [SampleEmployee; 5] = [
    SampleEmployee {
        first_name: "John",
        last_name: "Doe",
        email: "john.doe@company.com",
        phone: "+12345678901",
        department: 0,
        position: "Senior Software Engineer",
        hire_date: (2022, 1, 15),
        salary: 95000.0,
    },
    SampleEmployee {
        first_name: "Jane",
        last_name: "Smith",
        email: "jane.smith@company.com",
        phone: "+12345678902",
        department: 1,
        position: "HR Manager",
        hire_date: (2021, 3, 20),
        salary: 85000.0,
    },
    SampleEmployee {
        first_name: "Mike",
        last_name: "Johnson",
        email: "mike.johnson@company.com",
        phone: "+12345678903",
        department: 0,
        position: "Software Engineer",
        hire_date: (2023, 6, 10),
        salary: 75000.0,
    },
    SampleEmployee {
        first_name: "Sarah",
        last_name: "Williams",
        email: "sarah.williams@company.com",
        phone: "+12345678904",
        department: 2,
        position: "Sales Representative",
        hire_date: (2023, 2, 1),
        salary: 65000.0,
    },
    SampleEmployee {
        first_name: "David",
        last_name: "Brown",
        email: "david.brown@company.com",
        phone: "+12345678905",
        department: 3,
        position: "Marketing Specialist",
        hire_date: (2023, 9, 15),
        salary: 70000.0,
    },
];

fn date((y, m, d): (i32, u32, u32)) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("Invalid sample date {y}-{m}-{d}"))
}

/// Fills an empty store with sample records. Returns false when departments already exist.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        info!(departments = existing, "Store already has data, skipping seed");
        return Ok(false);
    }

    let mut department_ids = Vec::with_capacity(DEPARTMENTS.len());
    for (name, description) in DEPARTMENTS {
        let id = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to seed department {name}"))?
            .last_insert_rowid();
        department_ids.push(id);
    }

    let mut employee_ids = Vec::with_capacity(EMPLOYEES.len());
    for sample in &EMPLOYEES {
        let id = sqlx::query(
            r#"
            INSERT INTO employees
            (first_name, last_name, email, phone, department_id, position, hire_date, salary, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sample.first_name)
        .bind(sample.last_name)
        .bind(sample.email)
        .bind(sample.phone)
        .bind(department_ids[sample.department])
        .bind(sample.position)
        .bind(date(sample.hire_date)?)
        .bind(sample.salary)
        .bind(EmployeeStatus::Active)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to seed employee {}", sample.email))?
        .last_insert_rowid();
        employee_ids.push(id);
    }

    // John runs Engineering, Jane runs HR
    for (department, manager) in [(0, 0), (1, 1)] {
        sqlx::query("UPDATE departments SET manager_id = ? WHERE id = ?")
            .bind(employee_ids[manager])
            .bind(department_ids[department])
            .execute(&mut *tx)
            .await?;
    }

    let hr_manager = employee_ids[1];
    let leaves = [
        (
            employee_ids[2],
            LeaveType::Vacation,
            (2024, 12, 20),
            (2024, 12, 31),
            "Year-end vacation with family",
            LeaveStatus::Pending,
            None,
            (2024, 12, 1),
        ),
        (
            employee_ids[3],
            LeaveType::Sick,
            (2024, 11, 5),
            (2024, 11, 7),
            "Medical appointment and recovery",
            LeaveStatus::Approved,
            Some(hr_manager),
            (2024, 11, 1),
        ),
        (
            employee_ids[4],
            LeaveType::Personal,
            (2024, 11, 15),
            (2024, 11, 16),
            "Personal matters",
            LeaveStatus::Rejected,
            Some(hr_manager),
            (2024, 11, 10),
        ),
    ];

    for (employee_id, leave_type, start, end, reason, status, approved_by, created) in leaves {
        insert_leave(
            &mut tx,
            employee_id,
            leave_type,
            (date(start)?, date(end)?),
            reason,
            status,
            approved_by,
            date(created)?,
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        departments = department_ids.len(),
        employees = employee_ids.len(),
        "Sample data seeded"
    );

    Ok(true)
}

#[allow(clippy::too_many_arguments)]
async fn insert_leave(
    tx: &mut Transaction<'_, Sqlite>,
    employee_id: i64,
    leave_type: LeaveType,
    (start_date, end_date): (NaiveDate, NaiveDate),
    reason: &str,
    status: LeaveStatus,
    approved_by: Option<i64>,
    created_at: NaiveDate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, reason, status, approved_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(leave_type)
    .bind(start_date)
    .bind(end_date)
    .bind(reason)
    .bind(status)
    .bind(approved_by)
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Failed to seed leave request for employee {employee_id}"))?;
    Ok(())
}
