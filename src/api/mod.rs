//! HTTP API for the clinic records service.
//!
//! Public routes handle account registration and login. Patient routes sit
//! behind bearer-token authentication, and every handler receives the
//! caller's `ClinicIdentity` from the auth middleware.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server_on, ApiServer};
pub use types::ApiContext;
