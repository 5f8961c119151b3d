/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`token`]: opaque bearer token generation and parsing
/// - [`middleware`]: resolving request headers to an [`middleware::AuthContext`]
///
/// # Example
///
/// ```
/// use recipe_shared::auth::password::{hash_password, verify_password};
/// use recipe_shared::auth::token::generate_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("kamilsiler")?;
/// assert!(verify_password("kamilsiler", &hash)?);
///
/// let (token, token_hash) = generate_token();
/// # Ok(())
/// # }
/// ```

pub mod middleware;
pub mod password;
pub mod token;
