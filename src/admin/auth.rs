//! Bearer-token gate for the admin surface — same constant-time comparison
//! pattern as `gateway/auth.rs`'s `safe_equal`, simplified to the single
//! static token this surface needs (no per-request auth modes).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::AdminState;

/// Timing-safe string comparison.
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    if header.len() > 7 && header[..7].eq_ignore_ascii_case("bearer ") {
        Some(header[7..].trim())
    } else {
        None
    }
}

/// When `admin.token` is configured, reject any request whose
/// `Authorization: Bearer <token>` header doesn't match. With no token
/// configured the surface is open, matching local-dashboard deployments.
pub async fn admin_auth_layer(
    State(state): State<AdminState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token);

    match provided {
        Some(token) if safe_equal(expected, token) => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_standard() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
    }

    #[test]
    fn extract_bearer_case_insensitive() {
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
    }

    #[test]
    fn extract_bearer_rejects_non_bearer() {
        assert!(extract_bearer_token("Basic abc123").is_none());
        assert!(extract_bearer_token("").is_none());
    }

    #[test]
    fn safe_equal_matches_identical_strings() {
        assert!(safe_equal("secret-token", "secret-token"));
    }

    #[test]
    fn safe_equal_rejects_different_lengths() {
        assert!(!safe_equal("short", "much-longer-token"));
    }
}
