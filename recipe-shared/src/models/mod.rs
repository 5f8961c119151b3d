/// Database models
///
/// # Models
///
/// - `user`: user accounts, email normalization and credential checks
/// - `auth_token`: hashed bearer tokens issued at login
/// - `attribute`: tags and ingredients, selected by [`attribute::AttributeKind`]
/// - `recipe`: recipes and their tag/ingredient relations
///
/// Every query on tags, ingredients and recipes takes the owner's user id.
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::user::{create_user, UserExtra};
/// use recipe_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = create_user(&pool, "kamil@GMAIL.com", "kamilsiler", UserExtra {
///     name: "kamil".to_string(),
///     ..Default::default()
/// }).await?;
/// assert_eq!(user.email, "kamil@gmail.com");
/// # Ok(())
/// # }
/// ```

pub mod attribute;
pub mod auth_token;
pub mod recipe;
pub mod user;
