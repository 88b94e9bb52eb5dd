use super::*;

async fn staffed(ctx: &TestContext) -> (i64, i64) {
    let dept = sqlx::query("INSERT INTO departments (name, description) VALUES ('Eng', 'Builds')")
        .execute(&ctx.pool)
        .await
        .unwrap()
        .last_insert_rowid();

    let mut ids = Vec::new();
    for email in ["ann@x.com", "boss@x.com"] {
        let id = sqlx::query(
            r#"
            INSERT INTO employees
            (first_name, last_name, email, phone, department_id, position, hire_date, salary, status)
            VALUES ('Ann', 'Lee', ?, '555', ?, 'Engineer', '2024-01-01', 90000, 'active')
            "#,
        )
        .bind(email)
        .bind(dept)
        .execute(&ctx.pool)
        .await
        .unwrap()
        .last_insert_rowid();
        ids.push(id);
    }
    (ids[0], ids[1])
}

#[actix_web::test]
async fn end_before_start_is_rejected() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, _) = staffed(&ctx).await;

    let err = send(
        &app,
        post("/api/v1/leaves", leave_body(emp, "2024-06-05", "2024-06-01")),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(err["error"], "VALIDATION_ERROR");

    // single-day leave is fine
    create_leave(&app, emp, "2024-07-01", "2024-07-01").await;
}

#[actix_web::test]
async fn unknown_employee_is_a_reference_error() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    let err = send(
        &app,
        post("/api/v1/leaves", leave_body(77, "2024-06-01", "2024-06-02")),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(err["error"], "REFERENCE_ERROR");
}

#[actix_web::test]
async fn overlapping_requests_are_rejected() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    let first = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;

    let err = send(
        &app,
        post("/api/v1/leaves", leave_body(emp, "2024-06-05", "2024-06-08")),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(err["error"], "VALIDATION_ERROR");
    assert!(
        err["message"]
            .as_str()
            .is_some_and(|m| m.contains(&first.to_string()))
    );

    // another employee may take the same days
    create_leave(&app, boss, "2024-06-01", "2024-06-05").await;

    // cancelled requests free their dates
    send(
        &app,
        delete(&format!("/api/v1/leaves/{first}")),
        StatusCode::NO_CONTENT,
    )
    .await;
    create_leave(&app, emp, "2024-06-03", "2024-06-04").await;
}

#[actix_web::test]
async fn update_edits_only_pending_requests() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;

    // shrinking a request must not collide with itself
    let edited = send(
        &app,
        put(
            &format!("/api/v1/leaves/{id}"),
            json!({
                "leave_type": "personal",
                "start_date": "2024-06-02",
                "end_date": "2024-06-04",
                "reason": "shorter trip"
            }),
        ),
        StatusCode::OK,
    )
    .await;
    assert_eq!(edited["leave_type"], "personal");
    assert_eq!(edited["start_date"], "2024-06-02");
    assert_eq!(edited["status"], "pending");

    send(
        &app,
        post(
            &format!("/api/v1/leaves/{id}/approve"),
            json!({ "approved": false, "approved_by": boss, "comments": "busy week" }),
        ),
        StatusCode::OK,
    )
    .await;

    let err = send(
        &app,
        put(
            &format!("/api/v1/leaves/{id}"),
            json!({
                "leave_type": "vacation",
                "start_date": "2024-06-02",
                "end_date": "2024-06-03",
                "reason": "again"
            }),
        ),
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(err["error"], "INVALID_STATE_TRANSITION");

    send(
        &app,
        put(
            "/api/v1/leaves/999",
            json!({
                "leave_type": "vacation",
                "start_date": "2024-06-02",
                "end_date": "2024-06-03",
                "reason": "again"
            }),
        ),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[actix_web::test]
async fn rejection_records_decision() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;

    let leave = send(
        &app,
        post(
            &format!("/api/v1/leaves/{id}/approve"),
            json!({ "approved": false, "approved_by": boss, "comments": "busy week" }),
        ),
        StatusCode::OK,
    )
    .await;
    assert_eq!(leave["status"], "rejected");
    assert_eq!(leave["approved_by"], boss);
    assert_eq!(leave["comments"], "busy week");

    let err = send(
        &app,
        delete(&format!("/api/v1/leaves/{id}")),
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(err["error"], "INVALID_STATE_TRANSITION");
}

#[actix_web::test]
async fn approval_checks_request_and_approver() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, _) = staffed(&ctx).await;

    let err = send(
        &app,
        post(
            "/api/v1/leaves/999/approve",
            json!({ "approved": true, "approved_by": emp }),
        ),
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(err["error"], "NOT_FOUND");

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;
    let err = send(
        &app,
        post(
            &format!("/api/v1/leaves/{id}/approve"),
            json!({ "approved": true, "approved_by": 999 }),
        ),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(err["error"], "REFERENCE_ERROR");

    let leave = send(&app, get(&format!("/api/v1/leaves/{id}")), StatusCode::OK).await;
    assert_eq!(leave["status"], "pending");
}

#[actix_web::test]
async fn cancel_keeps_the_row() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, _) = staffed(&ctx).await;

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;

    send(
        &app,
        delete(&format!("/api/v1/leaves/{id}")),
        StatusCode::NO_CONTENT,
    )
    .await;

    let leave = send(&app, get(&format!("/api/v1/leaves/{id}")), StatusCode::OK).await;
    assert_eq!(leave["status"], "cancelled");

    send(
        &app,
        delete(&format!("/api/v1/leaves/{id}")),
        StatusCode::CONFLICT,
    )
    .await;
    send(&app, delete("/api/v1/leaves/999"), StatusCode::NOT_FOUND).await;
}

#[actix_web::test]
async fn concurrent_approvals_have_one_winner() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;
    let uri = format!("/api/v1/leaves/{id}/approve");

    let (first, second) = futures::join!(
        test::call_service(
            &app,
            post(&uri, json!({ "approved": true, "approved_by": boss }))
        ),
        test::call_service(
            &app,
            post(&uri, json!({ "approved": false, "approved_by": boss }))
        ),
    );

    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let leave = send(&app, get(&format!("/api/v1/leaves/{id}")), StatusCode::OK).await;
    assert_ne!(leave["status"], "pending");
}

#[actix_web::test]
async fn concurrent_overlapping_submissions_store_one() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, _) = staffed(&ctx).await;

    for month in 1..=10 {
        let (first, second) = futures::join!(
            test::call_service(
                &app,
                post(
                    "/api/v1/leaves",
                    leave_body(emp, &format!("2024-{month:02}-01"), &format!("2024-{month:02}-05")),
                )
            ),
            test::call_service(
                &app,
                post(
                    "/api/v1/leaves",
                    leave_body(emp, &format!("2024-{month:02}-03"), &format!("2024-{month:02}-08")),
                )
            ),
        );

        let mut statuses = [first.status(), second.status()];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST], "month {month}");
    }

    let stored = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_requests WHERE employee_id = ?",
    )
    .bind(emp)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(stored, 10);
}

#[actix_web::test]
async fn update_racing_a_submission_keeps_dates_disjoint() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, _) = staffed(&ctx).await;

    let id = create_leave(&app, emp, "2024-06-01", "2024-06-02").await;

    let (moved, created) = futures::join!(
        test::call_service(
            &app,
            put(
                &format!("/api/v1/leaves/{id}"),
                json!({
                    "leave_type": "vacation",
                    "start_date": "2024-06-10",
                    "end_date": "2024-06-12",
                    "reason": "moved"
                }),
            )
        ),
        test::call_service(&app, post("/api/v1/leaves", leave_body(emp, "2024-06-11", "2024-06-15"))),
    );

    let both = moved.status() == StatusCode::OK && created.status() == StatusCode::CREATED;
    assert!(!both, "overlapping update and submission were both stored");

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leave_requests a
        JOIN leave_requests b ON a.id < b.id AND a.employee_id = b.employee_id
        WHERE a.status IN ('pending', 'approved')
          AND b.status IN ('pending', 'approved')
          AND a.start_date <= b.end_date
          AND b.start_date <= a.end_date
        "#,
    )
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(overlapping, 0);
}

#[actix_web::test]
async fn list_filters_by_employee_and_status() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    create_leave(&app, emp, "2024-06-01", "2024-06-05").await;
    let decided = create_leave(&app, emp, "2024-07-01", "2024-07-02").await;
    create_leave(&app, boss, "2024-06-01", "2024-06-05").await;

    send(
        &app,
        post(
            &format!("/api/v1/leaves/{decided}/approve"),
            json!({ "approved": true, "approved_by": boss }),
        ),
        StatusCode::OK,
    )
    .await;

    let all = send(&app, get("/api/v1/leaves"), StatusCode::OK).await;
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let mine = send(
        &app,
        get(&format!("/api/v1/leaves?employee_id={emp}")),
        StatusCode::OK,
    )
    .await;
    assert_eq!(mine.as_array().map(Vec::len), Some(2));

    let approved = send(&app, get("/api/v1/leaves?status=approved"), StatusCode::OK).await;
    assert_eq!(approved.as_array().map(Vec::len), Some(1));
    assert_eq!(approved[0]["id"], decided);
}

#[actix_web::test]
async fn summary_counts_only_approved_days() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;
    let (emp, boss) = staffed(&ctx).await;

    let vacation = create_leave(&app, emp, "2024-06-01", "2024-06-05").await;
    create_leave(&app, emp, "2024-07-01", "2024-07-03").await;

    let mut sick = leave_body(emp, "2024-08-01", "2024-08-02");
    sick["leave_type"] = json!("sick");
    let sick = send(&app, post("/api/v1/leaves", sick), StatusCode::CREATED).await;
    let sick = sick["id"].as_i64().unwrap();

    for id in [vacation, sick] {
        send(
            &app,
            post(
                &format!("/api/v1/leaves/{id}/approve"),
                json!({ "approved": true, "approved_by": boss }),
            ),
            StatusCode::OK,
        )
        .await;
    }

    let summary = send(
        &app,
        get(&format!("/api/v1/leaves/employee/{emp}/summary")),
        StatusCode::OK,
    )
    .await;
    assert_eq!(summary["employee_id"], emp);
    assert_eq!(summary["total_requests"], 3);
    assert_eq!(summary["pending"], 1);
    assert_eq!(summary["approved"], 2);
    assert_eq!(summary["by_type"]["vacation"]["days"], 5);
    assert_eq!(summary["by_type"]["sick"]["days"], 2);
    assert_eq!(summary["total_approved_days"], 7);

    let empty = send(
        &app,
        get(&format!("/api/v1/leaves/employee/{boss}/summary")),
        StatusCode::OK,
    )
    .await;
    assert_eq!(empty["total_requests"], 0);
    assert_eq!(empty["by_type"]["vacation"], json!({ "count": 0, "days": 0 }));
    assert_eq!(empty["total_approved_days"], 0);

    send(
        &app,
        get("/api/v1/leaves/employee/999/summary"),
        StatusCode::NOT_FOUND,
    )
    .await;
}
