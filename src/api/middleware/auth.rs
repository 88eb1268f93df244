//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it, and injects the
//! caller's `ClinicIdentity` into request extensions for downstream
//! handlers. Rejected requests never reach a handler or the database.

use axum::http::header::{AUTHORIZATION, CACHE_CONTROL};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth;

/// Require a valid session token.
///
/// Reads `ApiContext` from request extensions (injected by the Extension
/// layer). Every response, accepted or not, is marked `no-store`.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    };
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let identity = auth::authenticate(&ctx.signer, header)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
