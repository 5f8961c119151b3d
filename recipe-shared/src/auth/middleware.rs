/// Token authentication for Axum
///
/// Resolves the `Authorization` header of a request to an active user.
/// The API server wraps [`authenticate`] in a `from_fn_with_state` layer
/// and inserts the resulting [`AuthContext`] into request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use recipe_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use super::token;
use crate::models::{auth_token::AuthToken, user::User};

/// The authenticated caller
///
/// Every ownership-scoped operation takes `user_id` from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

/// Error type for token authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    /// Header present but not `Bearer <token>` / `Token <token>`
    #[error("Invalid token header.")]
    InvalidFormat,

    /// Unknown token, or its user is inactive
    #[error("Invalid token.")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolves request headers to the calling user
///
/// # Errors
///
/// - `MissingCredentials` if there is no `Authorization` header
/// - `InvalidFormat` if the header is not a recognised scheme
/// - `InvalidToken` if no active user holds the token
pub async fn authenticate(pool: &PgPool, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;

    let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;
    let plaintext = token::parse_authorization(value).ok_or(AuthError::InvalidFormat)?;

    let user = AuthToken::resolve_user(pool, plaintext)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    debug!(user_id = user.id, "Authenticated request");

    Ok(AuthContext::from_user(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn test_user() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "Cook".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_auth_context_from_user() {
        let context = AuthContext::from_user(&test_user());

        assert_eq!(context.user_id, 7);
        assert_eq!(context.email, "cook@example.com");
        assert!(!context.is_staff);
        assert!(!context.is_superuser);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_before_touching_database() {
        // Lazy pool never connects unless a query runs
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();

        let headers = HeaderMap::new();
        assert!(matches!(
            authenticate(&pool, &headers).await,
            Err(AuthError::MissingCredentials)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            authenticate(&pool, &headers).await,
            Err(AuthError::InvalidFormat)
        ));

        // Well-formed header, malformed token: rejected by the format check
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token nothex"));
        assert!(matches!(
            authenticate(&pool, &headers).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
