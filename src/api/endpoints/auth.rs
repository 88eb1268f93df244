//! Account endpoints:
//! - `POST /register` provisions a clinic account
//! - `POST /login` exchanges credentials for a session token

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::{self, Credentials, Registration};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: Uuid,
    pub username: String,
    pub clinic_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: RegisteredUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /register`: create a clinic account.
pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if !ctx.allow_registration {
        return Err(ApiError::RegistrationDisabled);
    }
    let Json(registration) = payload?;

    let hasher = ctx.hasher;
    let account = ctx
        .with_db(move |conn| Ok(auth::register(conn, &hasher, &registration)?))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: RegisteredUser {
                id: account.id,
                username: account.username,
                clinic_name: account.clinic_name,
            },
        }),
    ))
}

/// `POST /login`: verify credentials and issue a session token.
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(credentials) = payload?;

    let hasher = ctx.hasher;
    let signer = ctx.signer.clone();
    let token = ctx
        .with_db(move |conn| Ok(auth::login(conn, &hasher, &signer, &credentials)?))
        .await?;

    Ok(Json(LoginResponse { token }))
}
