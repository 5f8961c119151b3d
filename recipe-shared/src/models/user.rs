/// User model, account manager and credential check
///
/// Email is the login identifier. It is stored with its domain part
/// lowercased and must be unique. Passwords are stored as Argon2id hashes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL DEFAULT '',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::user::{create_user, create_superuser, UserExtra};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = create_user(
///     &pool,
///     "kamil@GMAIL.COM",
///     "kamilsiler",
///     UserExtra { name: "kamil".to_string(), ..Default::default() },
/// )
/// .await?;
/// assert_eq!(user.email, "kamil@gmail.com");
///
/// let admin = create_superuser(&pool, "admin@example.com", "secret", UserExtra::default()).await?;
/// assert!(admin.is_staff && admin.is_superuser);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::auth::password::{self, PasswordError};

const USER_COLUMNS: &str = "id, email, password_hash, name, is_active, is_staff, is_superuser, \
                            created_at, updated_at, last_login_at";

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Email with normalized domain
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Inactive users cannot obtain or use tokens
    pub is_active: bool,

    pub is_staff: bool,

    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Row-level input for inserting a user
///
/// Callers normally go through [`create_user`], which normalizes the email
/// and hashes the password first.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Optional fields accepted by [`create_user`]
#[derive(Debug, Clone)]
pub struct UserExtra {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for UserExtra {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Errors from the account manager functions
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Users must have an email address")]
    EmptyEmail,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Normalizes an email address
///
/// Lowercases the domain part (after the last `@`) and keeps the local
/// part as typed. Surrounding whitespace is dropped. Addresses without `@`
/// are returned trimmed but otherwise unchanged.
///
/// # Example
///
/// ```
/// use recipe_shared::models::user::normalize_email;
///
/// assert_eq!(normalize_email("Kamil@GMAIL.COM"), "Kamil@gmail.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

impl User {
    /// Inserts a user row
    ///
    /// # Errors
    ///
    /// Fails on a duplicate email (`users_email_key`) or connection problems.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name, is_active, is_staff, is_superuser)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.is_active)
            .bind(data.is_staff)
            .bind(data.is_superuser)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email
    ///
    /// The lookup normalizes `email` first, so `kamil@GMAIL.com` finds the
    /// account registered as `kamil@gmail.com`. The local part is matched
    /// exactly.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Only `Some` fields in `data` are written; `updated_at` is always bumped.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if no user has this ID
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }
        if data.is_staff.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_staff = ${}", bind_count));
        }
        if data.is_superuser.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_superuser = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(normalize_email(&email));
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(is_staff) = data.is_staff {
            q = q.bind(is_staff);
        }
        if let Some(is_superuser) = data.is_superuser {
            q = q.bind(is_superuser);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user by ID
    ///
    /// Tags, ingredients, recipes and tokens owned by the user are removed
    /// by `ON DELETE CASCADE`.
    ///
    /// # Returns
    ///
    /// True if a user was deleted
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks a plaintext password against the stored hash
    pub fn check_password(&self, password: &str) -> Result<bool, PasswordError> {
        password::verify_password(password, &self.password_hash)
    }
}

/// Creates a user account
///
/// Rejects an empty email, normalizes the domain, hashes `password` and
/// inserts the row.
///
/// # Errors
///
/// - `UserError::EmptyEmail` if `email` is blank; nothing is written
/// - `UserError::Database` on a duplicate email or connection failure
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password: &str,
    extra: UserExtra,
) -> Result<User, UserError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(UserError::EmptyEmail);
    }

    let password_hash = password::hash_password(password)?;

    let user = User::create(
        pool,
        CreateUser {
            email,
            password_hash,
            name: extra.name,
            is_active: extra.is_active,
            is_staff: extra.is_staff,
            is_superuser: extra.is_superuser,
        },
    )
    .await?;

    info!(user_id = user.id, "Created user");
    Ok(user)
}

/// Creates a user with the staff and superuser flags set
///
/// The flags in `extra` are overridden; the row is written in one insert.
pub async fn create_superuser(
    pool: &PgPool,
    email: &str,
    password: &str,
    extra: UserExtra,
) -> Result<User, UserError> {
    let extra = UserExtra {
        is_staff: true,
        is_superuser: true,
        ..extra
    };

    let user = create_user(pool, email, password, extra).await?;

    info!(user_id = user.id, "Created superuser");
    Ok(user)
}

/// Checks an email/password pair
///
/// # Returns
///
/// The user if the credentials match an active account, `None` otherwise.
/// Callers must not tell the client which part was wrong.
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<User>, UserError> {
    let Some(user) = User::find_by_email(pool, email).await? else {
        // Same Argon2 cost as a wrong password
        password::verify_password(password, password::DUMMY_PASSWORD_HASH)?;
        debug!("Authentication failed: unknown email");
        return Ok(None);
    };

    if !user.check_password(password)? {
        debug!(user_id = user.id, "Authentication failed: wrong password");
        return Ok(None);
    }

    if !user.is_active {
        debug!(user_id = user.id, "Authentication failed: inactive user");
        return Ok(None);
    }

    Ok(Some(user))
}
