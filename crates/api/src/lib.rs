//! Mixdown API server library.
//!
//! Exposes the core building blocks (config, state, error handling, routes,
//! auth, mailer) so integration tests and the binary entrypoint can both
//! access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
