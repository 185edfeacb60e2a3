use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockbook_core::UserId;

use crate::app::errors;
use crate::context::ActorContext;

/// Header carrying the acting user id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Resolve the acting user from `x-actor-id` and attach an `ActorContext`.
pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let actor = match extract_actor(req.headers()) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    req.extensions_mut().insert(ActorContext::new(actor));
    next.run(req).await
}

fn extract_actor(headers: &HeaderMap) -> Result<UserId, Response> {
    let header = headers.get(ACTOR_HEADER).ok_or_else(|| {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "missing_actor",
            format!("{ACTOR_HEADER} header is required"),
        )
    })?;

    header
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_actor",
                format!("{ACTOR_HEADER} must be a UUID"),
            )
        })
}
