use crate::error::AppError;
use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use isbot::Bots;
use tracing::warn;

/// Heuristic bot filter, layered over the whole router.
///
/// Scores the request from its user agent and header shape; a score of 100
/// or more rejects the request. Browsers advertising `Mozilla/` are expected
/// to send the usual `Accept*` headers, so their absence raises the score.
/// Health and metrics probes (load balancers, scrapers) identify themselves
/// as non-browsers, so those paths bypass scoring.
pub async fn bot_detection_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bots = Bots::default();
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    if request.uri().path() == "/health" || request.uri().path() == "/metrics" {
        return Ok(next.run(request).await);
    }

    let user_agent = headers
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let mut score = 0;

    if user_agent.is_empty() {
        score += 50;
    } else {
        if bots.is_bot(user_agent) {
            score += 100;
        }

        if user_agent.starts_with("Mozilla/") {
            let mut missing_headers = 0;
            if !headers.contains_key("Accept") {
                missing_headers += 1;
            }
            if !headers.contains_key("Accept-Language") {
                missing_headers += 1;
            }
            if !headers.contains_key("Accept-Encoding") {
                missing_headers += 1;
            }

            if missing_headers >= 2 {
                score += 70;
            } else if missing_headers == 1 {
                score += 30;
            }
        }
    }

    if score >= 100 {
        warn!(
            user_agent = %user_agent,
            score = %score,
            path = %request.uri(),
            "Blocking suspected bot request"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Bot detected")));
    }

    Ok(next.run(request).await)
}
