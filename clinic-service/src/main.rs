use clinic_service::{
    build_router,
    config::ClinicConfig,
    db,
    services::{Database, EmailService, JwtService, RedisService},
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = ClinicConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    clinic_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting clinic service"
    );

    tracing::info!("Initializing database connection");
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let database = Database::new(pool);
    tracing::info!("Database initialized successfully");

    let redis = RedisService::new(&config.redis).await?;
    tracing::info!("Redis service initialized");

    let email = EmailService::new(&config.smtp)?;
    let email = Arc::new(email);
    tracing::info!("Email service initialized");

    let jwt = JwtService::new(&config.jwt).map_err(service_core::error::AppError::ConfigError)?;
    tracing::info!("JWT service initialized");

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    let password_reset_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.password_reset_attempts,
        config.rate_limit.password_reset_window_seconds,
    );
    let registration_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.registration_attempts,
        config.rate_limit.registration_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized");

    let state = AppState {
        config: config.clone(),
        db: database,
        email,
        jwt,
        redis: Arc::new(redis),
        login_rate_limiter,
        register_rate_limiter,
        password_reset_rate_limiter,
        registration_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    // Give in-flight requests 30 seconds to complete
    tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
}
