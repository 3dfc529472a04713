//! HTTP basic authentication for the form and download routes.

use crate::config::Credentials;
use crate::web::AppState;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const REALM: &str = "Basic realm=\"studydeck\", charset=\"UTF-8\"";

/// Reject requests without matching credentials. A no-op when the server
/// runs without credentials.
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.server.credentials.as_ref() else {
        return next.run(request).await;
    };

    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic);

    match supplied {
        Some((user, pass)) if matches(expected, &user, &pass) => next.run(request).await,
        Some((user, _)) => {
            warn!("Rejected login for user '{}'", user);
            unauthorized()
        }
        None => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, REALM)],
        "Authentication required",
    )
        .into_response()
}

/// `Basic dXNlcjpwYXNz` → `("user", "pass")`.
fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn matches(expected: &Credentials, user: &str, pass: &str) -> bool {
    // Compare both parts every time so timing doesn't reveal which one failed.
    let user_ok = expected.username.as_bytes().ct_eq(user.as_bytes());
    let pass_ok = expected.password.as_bytes().ct_eq(pass.as_bytes());
    (user_ok & pass_ok).into()
}
