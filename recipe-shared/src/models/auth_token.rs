/// Auth token model
///
/// Each successful `POST /user/token` issues a fresh token row. Several
/// tokens per user may be live at once, one per client, up to
/// `MAX_TOKENS_PER_USER`; issuing past the cap revokes the oldest.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE auth_tokens (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_prefix VARCHAR(10) NOT NULL,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_used_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::auth::token;
use crate::models::user::User;

/// Live tokens kept per user
pub const MAX_TOKENS_PER_USER: i64 = 5;

/// Stored token (hash only)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthToken {
    pub id: i64,
    pub user_id: i64,

    /// First characters of the plaintext, for display
    pub token_prefix: String,

    /// SHA-256 of the plaintext
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Issues a new token for a user
    ///
    /// Tokens beyond the newest `MAX_TOKENS_PER_USER` are deleted in the
    /// same transaction.
    ///
    /// # Returns
    ///
    /// The stored row and the plaintext token. The plaintext is not
    /// recoverable afterwards.
    pub async fn issue(pool: &PgPool, user_id: i64) -> Result<(Self, String), sqlx::Error> {
        let (plaintext, hash) = token::generate_token();

        let mut tx = pool.begin().await?;

        let record = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (user_id, token_prefix, token_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_prefix, token_hash, created_at, last_used_at
            "#,
        )
        .bind(user_id)
        .bind(token::extract_prefix(&plaintext))
        .bind(hash)
        .fetch_one(&mut *tx)
        .await?;

        let revoked = sqlx::query(
            r#"
            DELETE FROM auth_tokens
            WHERE user_id = $1
              AND id NOT IN (
                  SELECT id FROM auth_tokens
                  WHERE user_id = $1
                  ORDER BY id DESC
                  LIMIT $2
              )
            "#,
        )
        .bind(user_id)
        .bind(MAX_TOKENS_PER_USER)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if revoked > 0 {
            debug!(user_id, revoked, "Revoked oldest tokens");
        }

        Ok((record, plaintext))
    }

    /// Resolves a plaintext token to its active owner
    ///
    /// Returns `None` for unknown tokens and for tokens whose user has been
    /// deactivated. Touches `last_used_at` on success.
    pub async fn resolve_user(pool: &PgPool, plaintext: &str) -> Result<Option<User>, sqlx::Error> {
        if !token::validate_token_format(plaintext) {
            return Ok(None);
        }

        sqlx::query_as::<_, User>(
            r#"
            WITH used AS (
                UPDATE auth_tokens
                SET last_used_at = NOW()
                WHERE token_hash = $1
                RETURNING user_id
            )
            SELECT u.id, u.email, u.password_hash, u.name, u.is_active, u.is_staff,
                   u.is_superuser, u.created_at, u.updated_at, u.last_login_at
            FROM users u
            JOIN used ON used.user_id = u.id
            WHERE u.is_active
            "#,
        )
        .bind(token::hash_token(plaintext))
        .fetch_optional(pool)
        .await
    }
}
