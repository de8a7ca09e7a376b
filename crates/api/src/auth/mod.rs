//! Authentication and authorization primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation, validation, and refresh-token helpers.
//! - [`totp`] -- RFC 6238 time-based one-time passwords for 2FA.

pub mod jwt;
pub mod password;
pub mod totp;
