use crate::{
    api::{department, employee, health, leave_request},
    config::Config,
    docs::ApiDoc,
    errors::AppError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{Logger, NormalizePath},
    web,
};
use anyhow::Context;
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub type RateLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
pub fn rate_limiter(requests_per_min: u32) -> anyhow::Result<RateLimit> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("Invalid rate limit configuration")
}

/// The whole application, shared by the server and the HTTP tests.
pub fn app(
    pool: SqlitePool,
    config: Config,
    rate_limit: RateLimit,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(Logger::default())
        .wrap(NormalizePath::trim())
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} to match JS/CSS files
                .url("/api-doc/openapi.json", ApiDoc::openapi()),
        )
        .app_data(web::Data::new(pool))
        .app_data(web::Data::new(config.clone()))
        .configure(|cfg| configure(cfg, &config, &rate_limit))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, rate_limit: &RateLimit) {
    // Extractor failures use the same error envelope as the handlers
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    // Public, not rate limited
    cfg.route("/", web::get().to(health::index))
        .route("/health", web::get().to(health::health));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(rate_limit))
            .service(
                web::scope("/departments")
                    // /departments
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    // /departments/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(department::get_department))
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    )
                    // /departments/{id}/stats
                    .service(
                        web::resource("/{id}/stats")
                            .route(web::get().to(department::department_stats)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /employees/department/{id}/employees
                    .service(
                        web::resource("/department/{id}/employees")
                            .route(web::get().to(employee::list_department_employees)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    // /leaves
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leaves/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::put().to(leave_request::update_leave))
                            .route(web::delete().to(leave_request::cancel_leave)),
                    )
                    // /leaves/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(leave_request::approve_leave)),
                    )
                    // /leaves/employee/{id}/summary
                    .service(
                        web::resource("/employee/{id}/summary")
                            .route(web::get().to(leave_request::employee_leave_summary)),
                    ),
            ),
    );
}
