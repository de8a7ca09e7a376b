//! Repository for the `account_tokens` table.
//!
//! Tokens are one-shot: consumption is a single atomic UPDATE so a token can
//! never be redeemed twice.

use mixdown_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::account_token::{AccountToken, TokenPurpose};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, user_id, token_hash, purpose, expires_at, consumed_at, created_at";

/// Provides issue/consume operations for one-shot account tokens.
pub struct AccountTokenRepo;

impl AccountTokenRepo {
    /// Insert a new token row, returning it.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        token_hash: &str,
        purpose: TokenPurpose,
        expires_at: Timestamp,
    ) -> Result<AccountToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO account_tokens (user_id, token_hash, purpose, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccountToken>(&query)
            .bind(user_id)
            .bind(token_hash)
            .bind(purpose.as_str())
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Atomically consume an unexpired, unconsumed token, returning the row.
    ///
    /// Returns `None` when no matching token exists (wrong hash or purpose,
    /// already consumed, or expired).
    pub async fn consume(
        pool: &PgPool,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<AccountToken>, sqlx::Error> {
        let query = format!(
            "UPDATE account_tokens SET consumed_at = NOW()
             WHERE token_hash = $1
               AND purpose = $2
               AND consumed_at IS NULL
               AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccountToken>(&query)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Invalidate all outstanding tokens of one purpose for a user, so a
    /// newly issued token is the only valid one.
    pub async fn invalidate_for_user(
        pool: &PgPool,
        user_id: DbId,
        purpose: TokenPurpose,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE account_tokens SET consumed_at = NOW()
             WHERE user_id = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired or consumed tokens. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM account_tokens WHERE expires_at < NOW() OR consumed_at IS NOT NULL",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
