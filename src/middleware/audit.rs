use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};

use super::{AppState, AuthUser};
use crate::services::LogService;

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::DELETE)
}

/// Appends a system log row for every mutating API call once it has been handled.
pub async fn audit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if !is_mutating(&method) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let actor = AuthUser::from_headers(request.headers(), &state.config)
        .ok()
        .map(|user| user.user_id);

    let response = next.run(request).await;

    let detail = format!("Request to {} ({})", path, response.status().as_u16());
    if let Err(e) = LogService::record(&state.pool, actor, method.as_str(), "API", None, Some(detail.as_str())).await {
        tracing::warn!("Failed to write system log for {} {}: {}", method, path, e);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_writes_are_audited() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PUT));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::OPTIONS));
    }
}
