//! Clinic authentication: account registration, password login, and bearer
//! token verification.
//!
//! Login failures never say whether the username exists. Token checks are
//! stateless: the signature and expiry are the whole story.

use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::crypto::{CryptoError, PasswordHasher, TokenSigner};
use crate::db::{self, DatabaseError};
use crate::models::{ClinicAccount, ClinicIdentity};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("No token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("{0}")]
    Validation(String),
    #[error("Username already exists")]
    UsernameTaken,
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Account provisioning request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "clinic_name")]
    pub clinic_name: String,
}

/// Create a clinic account. The username is stored exactly as given, since
/// login matches it byte for byte. The clinic name is stored trimmed and the
/// password is hashed as given.
pub fn register(
    conn: &Connection,
    hasher: &PasswordHasher,
    registration: &Registration,
) -> Result<ClinicAccount, AuthError> {
    let username = registration.username.as_str();
    let clinic_name = registration.clinic_name.trim();

    let mut missing = Vec::new();
    if username.trim().is_empty() {
        missing.push("username");
    }
    if registration.password.trim().is_empty() {
        missing.push("password");
    }
    if clinic_name.is_empty() {
        missing.push("clinicName");
    }
    if !missing.is_empty() {
        return Err(AuthError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let account = ClinicAccount {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hasher.hash(&registration.password),
        clinic_name: clinic_name.to_string(),
        created_at: db::now_timestamp(),
    };

    match db::insert_clinic(conn, &account) {
        Ok(()) => {
            tracing::info!(clinic_id = %account.id, "Clinic account registered");
            Ok(account)
        }
        Err(e) if e.is_unique_violation() => Err(AuthError::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

/// Check a username and password and issue a session token.
///
/// An unknown username and a wrong password produce the same error, and
/// both paths run one password derivation.
pub fn login(
    conn: &Connection,
    hasher: &PasswordHasher,
    signer: &TokenSigner,
    credentials: &Credentials,
) -> Result<String, AuthError> {
    let Some(account) = db::get_clinic_by_username(conn, &credentials.username)? else {
        hasher.verify_dummy(&credentials.password);
        tracing::warn!("Login failed");
        return Err(AuthError::InvalidCredentials);
    };

    if !hasher.verify(&credentials.password, &account.password_hash) {
        tracing::warn!("Login failed");
        return Err(AuthError::InvalidCredentials);
    }

    let token = signer.issue(&ClinicIdentity::from(&account), Utc::now())?;
    tracing::info!(clinic_id = %account.id, "Clinic logged in");
    Ok(token)
}

/// Resolve the caller from an `Authorization` header value.
pub fn authenticate(
    signer: &TokenSigner,
    authorization: Option<&str>,
) -> Result<ClinicIdentity, AuthError> {
    let token = authorization
        .and_then(bearer_token)
        .ok_or(AuthError::MissingToken)?;

    match signer.verify(token, Utc::now()) {
        Ok(claims) => Ok(claims.identity()),
        Err(e) => {
            tracing::debug!(reason = %e, "Rejected session token");
            Err(AuthError::InvalidToken)
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
