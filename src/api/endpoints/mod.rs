//! API endpoint handlers. Handlers stay thin: they extract, hand off to the
//! `auth` and `patients` services on the blocking pool, and serialize.

pub mod auth;
pub mod health;
pub mod patients;
