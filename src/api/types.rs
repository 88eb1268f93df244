//! Shared types for the HTTP API layer.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::config::ServerConfig;
use crate::crypto::{CryptoError, PasswordHasher, TokenSigner};
use crate::db;

/// Shared context for all API routes and middleware.
///
/// Holds only immutable settings. Every request opens its own database
/// connection through [`ApiContext::with_db`].
#[derive(Clone)]
pub struct ApiContext {
    pub db_path: Arc<PathBuf>,
    pub hasher: PasswordHasher,
    pub signer: Arc<TokenSigner>,
    pub allow_registration: bool,
}

impl ApiContext {
    pub fn new(
        db_path: PathBuf,
        hasher: PasswordHasher,
        signer: TokenSigner,
        allow_registration: bool,
    ) -> Self {
        Self {
            db_path: Arc::new(db_path),
            hasher,
            signer: Arc::new(signer),
            allow_registration,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, CryptoError> {
        Ok(Self::new(
            config.db_path.clone(),
            PasswordHasher::new(config.pbkdf2_iterations),
            TokenSigner::new(config.token_secret.as_bytes())?,
            config.allow_registration,
        ))
    }

    /// Create the database if needed and bring its schema up to date.
    /// Call once before serving.
    pub fn prepare_database(&self) -> Result<(), db::DatabaseError> {
        db::open_database(&self.db_path).map(drop)
    }

    /// Open a connection to the already-migrated clinic database.
    pub fn open_db(&self) -> Result<Connection, ApiError> {
        db::connect(&self.db_path).map_err(ApiError::from)
    }

    /// Run `work` against a fresh connection on the blocking pool. Password
    /// hashing and SQLite calls both block.
    pub async fn with_db<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = ctx.open_db()?;
            work(&conn)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}
