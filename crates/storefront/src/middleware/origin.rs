//! Cross-site request rejection.
//!
//! Mutating requests must come from the storefront's own origin. Browsers
//! send `Origin` (or at least `Referer`) on cross-site submissions; a
//! mismatch against the configured base URL is rejected before any state is
//! touched. Requests with neither header (curl, server-to-server) pass - the
//! rate limiter still covers those.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::http::header::{ORIGIN, REFERER};
use axum::middleware::Next;
use axum::response::Response;
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

/// Axum middleware verifying the request origin on mutating methods.
///
/// # Errors
///
/// Returns [`AppError::Validation`] (400) for a cross-site submission.
pub async fn verify_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mutating = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    );
    if mutating {
        let declared = request
            .headers()
            .get(ORIGIN)
            .or_else(|| request.headers().get(REFERER))
            .and_then(|v| v.to_str().ok());
        if let Some(candidate) = declared
            && !same_origin(candidate, &state.config().base_url)
        {
            tracing::warn!(origin = candidate, "cross-site request rejected");
            return Err(AppError::Validation("cross-site request rejected".to_owned()));
        }
    }
    Ok(next.run(request).await)
}

/// Whether `candidate` (an Origin or Referer value) shares scheme, host, and
/// port with `base`.
fn same_origin(candidate: &str, base: &str) -> bool {
    let (Ok(candidate), Ok(base)) = (Url::parse(candidate), Url::parse(base)) else {
        return false;
    };
    candidate.scheme() == base.scheme()
        && candidate.host_str() == base.host_str()
        && candidate.port_or_known_default() == base.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:3000";

    #[test]
    fn test_same_origin_accepts_self() {
        assert!(same_origin("http://localhost:3000", BASE));
        // Referer values carry a path; origin comparison ignores it.
        assert!(same_origin("http://localhost:3000/cart", BASE));
    }

    #[test]
    fn test_same_origin_rejects_foreign() {
        assert!(!same_origin("https://evil.example", BASE));
        assert!(!same_origin("http://localhost:4000", BASE));
        assert!(!same_origin("https://localhost:3000", BASE), "scheme matters");
        assert!(!same_origin("not a url", BASE));
    }

    #[test]
    fn test_same_origin_default_ports() {
        assert!(same_origin("https://shop.example", "https://shop.example:443"));
    }
}
