use crate::{
    api::{attendance, holiday, settings},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;
use tracing::warn;

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish();
    match cfg {
        Some(cfg) => Governor::new(&cfg),
        None => {
            warn!(requests_per_min, "Invalid rate limit, falling back to governor defaults");
            Governor::new(&GovernorConfig::default())
        }
    }
}

/// Extractor failures use the same `{ success: false, message }` body as every other error.
fn extractor_errors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    extractor_errors(cfg);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out)),
                    )
                    .service(web::resource("/daily").route(web::get().to(attendance::daily)))
                    .service(web::resource("/monthly").route(web::get().to(attendance::monthly)))
                    // /attendance/employee/{employeeId}
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(attendance::employee_history)),
                    )
                    .service(
                        web::resource("/manual-mark")
                            .route(web::post().to(attendance::manual_mark)),
                    )
                    .service(
                        web::resource("/holidays").route(web::post().to(holiday::create_holiday)),
                    )
                    // /attendance/holidays/{id}
                    .service(
                        web::resource("/holidays/{id}")
                            .route(web::delete().to(holiday::delete_holiday)),
                    )
                    .service(
                        web::resource("/holiday-calendar")
                            .route(web::get().to(holiday::holiday_calendar)),
                    )
                    .service(
                        web::resource("/settings")
                            .route(web::get().to(settings::get_settings))
                            .route(web::put().to(settings::update_settings)),
                    ),
            ),
    );
}
