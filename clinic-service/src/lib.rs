pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use service_core::error::AppError;
use service_core::middleware::{
    bot_detection_middleware, ip_rate_limit_middleware, request_id_middleware,
    security_headers_middleware, IpRateLimiter,
};

use crate::config::ClinicConfig;
use crate::middleware::{auth_middleware, metrics_middleware, require_role_middleware};
use crate::models::AppRole;
use crate::services::{Database, EmailProvider, JwtService, TokenBlacklist};

#[derive(Clone)]
pub struct AppState {
    pub config: ClinicConfig,
    pub db: Database,
    pub email: Arc<dyn EmailProvider>,
    pub jwt: JwtService,
    pub redis: Arc<dyn TokenBlacklist>,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub password_reset_rate_limiter: IpRateLimiter,
    pub registration_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Credential endpoints get their own, tighter limiters.
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route(
            "/auth/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let reset_request_route = Router::new()
        .route(
            "/auth/password-reset/request",
            post(handlers::auth::request_password_reset),
        )
        .layer(from_fn_with_state(
            state.password_reset_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let registration_route = Router::new()
        .route(
            "/registrations",
            post(handlers::registrations::submit_registration),
        )
        .layer(from_fn_with_state(
            state.registration_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Everything behind the route guard: bearer token, blacklist check,
    // suspension and verification gates, profile provisioning.
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/invitations/accept",
            post(handlers::invitation::accept_invitation),
        )
        .route(
            "/me",
            get(handlers::user::get_me).patch(handlers::user::update_me),
        )
        .route("/me/context", get(handlers::user::get_context))
        .route("/me/password", post(handlers::user::change_password))
        .route(
            "/me/api-keys",
            get(handlers::api_keys::list_api_keys).post(handlers::api_keys::create_api_key),
        )
        .route(
            "/me/api-keys/:api_key_id",
            delete(handlers::api_keys::revoke_api_key),
        )
        .route(
            "/clinics",
            get(handlers::clinic::list_clinics).post(handlers::clinic::create_clinic),
        )
        .route(
            "/clinics/:clinic_id",
            get(handlers::clinic::get_clinic)
                .patch(handlers::clinic::update_clinic)
                .delete(handlers::clinic::archive_clinic),
        )
        .route(
            "/clinics/:clinic_id/invitations",
            get(handlers::invitation::list_invitations)
                .post(handlers::invitation::create_invitation),
        )
        .route(
            "/clinics/:clinic_id/invitations/:invitation_id",
            delete(handlers::invitation::revoke_invitation),
        )
        .route(
            "/clinics/:clinic_id/invitations/:invitation_id/renew",
            post(handlers::invitation::renew_invitation),
        )
        .route(
            "/clinics/:clinic_id/doctors",
            get(handlers::doctor::list_doctors).post(handlers::doctor::create_doctor),
        )
        .route(
            "/clinics/:clinic_id/doctors/:doctor_id",
            get(handlers::doctor::get_doctor)
                .patch(handlers::doctor::update_doctor)
                .delete(handlers::doctor::deactivate_doctor),
        )
        .route(
            "/clinics/:clinic_id/patients",
            get(handlers::patient::list_patients).post(handlers::patient::create_patient),
        )
        .route(
            "/clinics/:clinic_id/patients/:patient_id",
            get(handlers::patient::get_patient)
                .patch(handlers::patient::update_patient)
                .delete(handlers::patient::delete_patient),
        )
        .route(
            "/clinics/:clinic_id/exams",
            get(handlers::exam::list_exams).post(handlers::exam::create_exam),
        )
        .route(
            "/clinics/:clinic_id/exams/:exam_id",
            get(handlers::exam::get_exam)
                .patch(handlers::exam::update_exam)
                .delete(handlers::exam::delete_exam),
        )
        .route(
            "/clinics/:clinic_id/medical-records",
            get(handlers::medical_record::list_medical_records)
                .post(handlers::medical_record::create_medical_record),
        )
        .route(
            "/clinics/:clinic_id/medical-records/:record_id",
            get(handlers::medical_record::get_medical_record)
                .patch(handlers::medical_record::update_medical_record)
                .delete(handlers::medical_record::delete_medical_record),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    // Platform admin surface: guard first, then the role gate.
    let admin_routes = Router::new()
        .route(
            "/admin/registrations",
            get(handlers::registrations::list_registrations),
        )
        .layer(from_fn_with_state(AppRole::Admin, require_role_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/verify", get(handlers::auth::verify_email))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        .route(
            "/invitations/:token",
            get(handlers::invitation::resolve_invitation),
        )
        .merge(login_route)
        .merge(register_routes)
        .merge(reset_request_route)
        .merge(registration_route)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(bot_detection_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    HeaderName::from_static("x-request-id"),
                ]),
        );

    Ok(app)
}

/// Service health check: answers 200 only when Postgres and Redis are
/// both reachable.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Postgres health check failed");
        e
    })?;

    state.redis.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Redis health check failed");
        AppError::InternalError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up",
            "redis": "up"
        }
    })))
}
