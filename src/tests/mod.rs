//! HTTP scenarios against the real app and a throwaway SQLite file.

mod leaves;

use crate::config::Config;
use crate::db::init_db;
use crate::routes;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tempfile::TempDir;

type Request = actix_http::Request;

const PEER: &str = "127.0.0.1:40000";

/// Owns the temp dir so the database outlives the test body.
pub(crate) struct TestContext {
    _dir: TempDir,
    pub pool: SqlitePool,
    pub config: Config,
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            database_url: format!("sqlite://{}", dir.path().join("hrms.db").display()),
            server_addr: "127.0.0.1:0".to_string(),
            api_prefix: "/api/v1".to_string(),
            environment: "test".to_string(),
            db_max_connections: 5,
            rate_api_per_min: 100_000,
            log_dir: dir.path().join("logs").display().to_string(),
            log_level: "warn".to_string(),
            seed_demo_data: false,
        };
        let pool = init_db(&config).await.expect("Failed to init DB");

        Self {
            _dir: dir,
            pool,
            config,
        }
    }
}

/// Builds the app from owned parts so the service is `'static`.
pub(crate) fn build_app(
    pool: SqlitePool,
    config: Config,
) -> actix_web::App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let rate_limit = routes::rate_limiter(config.rate_api_per_min).expect("rate limiter");
    routes::app(pool, config, rate_limit)
}

fn peer() -> SocketAddr {
    PEER.parse().expect("peer address")
}

pub(crate) fn get(uri: &str) -> Request {
    TestRequest::get().uri(uri).peer_addr(peer()).to_request()
}

pub(crate) fn delete(uri: &str) -> Request {
    TestRequest::delete().uri(uri).peer_addr(peer()).to_request()
}

pub(crate) fn post(uri: &str, body: Value) -> Request {
    TestRequest::post()
        .uri(uri)
        .peer_addr(peer())
        .set_json(body)
        .to_request()
}

pub(crate) fn put(uri: &str, body: Value) -> Request {
    TestRequest::put()
        .uri(uri)
        .peer_addr(peer())
        .set_json(body)
        .to_request()
}

/// Sends `req`, asserts the status and returns the JSON body (Null for empty bodies).
pub(crate) async fn send<S, B>(app: &S, req: Request, expected: StatusCode) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}

pub(crate) fn department_body(name: &str) -> Value {
    json!({ "name": name, "description": format!("{name} team") })
}

pub(crate) fn employee_body(email: &str, department_id: i64) -> Value {
    json!({
        "first_name": "Ann",
        "last_name": "Lee",
        "email": email,
        "phone": "555",
        "department_id": department_id,
        "position": "Engineer",
        "hire_date": "2024-01-01",
        "salary": 90000,
        "status": "active"
    })
}

pub(crate) fn leave_body(employee_id: i64, start: &str, end: &str) -> Value {
    json!({
        "employee_id": employee_id,
        "leave_type": "vacation",
        "start_date": start,
        "end_date": end,
        "reason": "trip"
    })
}

pub(crate) async fn create_department<S, B>(app: &S, name: &str) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let body = send(
        app,
        post("/api/v1/departments", department_body(name)),
        StatusCode::CREATED,
    )
    .await;
    body["id"].as_i64().expect("department id")
}

pub(crate) async fn create_employee<S, B>(app: &S, email: &str, department_id: i64) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let body = send(
        app,
        post("/api/v1/employees", employee_body(email, department_id)),
        StatusCode::CREATED,
    )
    .await;
    body["id"].as_i64().expect("employee id")
}

pub(crate) async fn create_leave<S, B>(app: &S, employee_id: i64, start: &str, end: &str) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let body = send(
        app,
        post("/api/v1/leaves", leave_body(employee_id, start, end)),
        StatusCode::CREATED,
    )
    .await;
    body["id"].as_i64().expect("leave id")
}

#[actix_web::test]
async fn health_reports_reachable_database() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    let body = send(&app, get("/health"), StatusCode::OK).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
}

#[actix_web::test]
async fn health_reports_closed_pool() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    ctx.pool.close().await;

    let body = send(&app, get("/health"), StatusCode::SERVICE_UNAVAILABLE).await;
    assert_eq!(body["status"], "unhealthy");
}

#[actix_web::test]
async fn openapi_document_is_served() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    let body = send(&app, get("/api-doc/openapi.json"), StatusCode::OK).await;
    assert_eq!(body["info"]["title"], "HRMS API");
}

#[actix_web::test]
async fn malformed_payload_uses_error_envelope() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    let body = send(
        &app,
        post("/api/v1/departments", json!({ "description": "no name" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let body = send(
        &app,
        get("/api/v1/departments/abc"),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

/// Department, employee, leave and approval end to end.
#[actix_web::test]
async fn engineering_scenario() {
    let ctx = TestContext::new().await;
    let app = test::init_service(build_app(ctx.pool.clone(), ctx.config.clone())).await;

    let dept = send(
        &app,
        post(
            "/api/v1/departments/",
            json!({ "name": "Engineering", "description": "Builds things" }),
        ),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(dept["id"], 1);
    assert_eq!(dept["employee_count"], 0);

    let emp = send(
        &app,
        post("/api/v1/employees/", employee_body("a@x.com", 1)),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(emp["id"], 1);
    assert_eq!(emp["salary"], 90000.0);

    let dept = send(&app, get("/api/v1/departments/1"), StatusCode::OK).await;
    assert_eq!(dept["employee_count"], 1);

    let leave = send(
        &app,
        post(
            "/api/v1/leaves/",
            leave_body(1, "2024-06-01", "2024-06-05"),
        ),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(leave["id"], 1);
    assert_eq!(leave["status"], "pending");
    assert!(leave["approved_by"].is_null());

    let approve = json!({ "approved": true, "approved_by": 1, "comments": "ok" });
    let leave = send(
        &app,
        post("/api/v1/leaves/1/approve", approve.clone()),
        StatusCode::OK,
    )
    .await;
    assert_eq!(leave["status"], "approved");
    assert_eq!(leave["approved_by"], 1);
    assert_eq!(leave["comments"], "ok");

    let err = send(
        &app,
        post("/api/v1/leaves/1/approve", approve),
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(err["error"], "INVALID_STATE_TRANSITION");

    let summary = send(
        &app,
        get("/api/v1/leaves/employee/1/summary"),
        StatusCode::OK,
    )
    .await;
    assert_eq!(summary["approved"], 1);
    assert_eq!(summary["by_type"]["vacation"]["count"], 1);
    assert_eq!(summary["by_type"]["vacation"]["days"], 5);
    assert_eq!(summary["total_approved_days"], 5);
}
