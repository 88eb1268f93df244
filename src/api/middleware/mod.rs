//! API middleware.
//!
//! Execution order (outermost first): request logging on every route, then
//! bearer authentication on the `/patients` routes.

pub mod auth;
pub mod logging;
