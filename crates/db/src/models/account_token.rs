//! One-shot account tokens (email verification, password reset).

use mixdown_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// What an account token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    /// Database `purpose` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify_email",
            Self::ResetPassword => "reset_password",
        }
    }
}

/// A row from the `account_tokens` table. Only the SHA-256 hash of the
/// token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccountToken {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub purpose: String,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
