//! Basic-auth access guard for mutating endpoints
//!
//! Deletes always pass through the guard, uploads only when
//! `auth.protectUpload` is set. With authentication disabled in the
//! configuration the guard lets everything through.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{config::AuthConfig, error::AppError, state::AppState};

/// Decode a `Basic` Authorization header into its raw `user:password` bytes.
fn extract_basic_credentials(headers: &HeaderMap) -> Option<Vec<u8>> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    STANDARD.decode(encoded.trim()).ok()
}

/// Compare the request's credentials with the configured ones.
pub fn check_authentication(headers: &HeaderMap, auth: &AuthConfig) -> bool {
    if !auth.enabled {
        return true;
    }

    let Some(presented) = extract_basic_credentials(headers) else {
        return false;
    };
    let expected = format!("{}:{}", auth.user, auth.password);
    presented == expected.as_bytes()
}

/// Middleware rejecting requests that fail [`check_authentication`]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !check_authentication(req.headers(), &state.config.auth) {
        warn!(method = %req.method(), uri = %req.uri(), "Rejected unauthenticated request");
        return Err(AppError::Unauthorized("not authorized".to_string()));
    }

    debug!(uri = %req.uri(), "Request authenticated");
    Ok(next.run(req).await)
}
