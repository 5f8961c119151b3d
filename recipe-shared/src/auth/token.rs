/// Opaque bearer token utilities
///
/// Tokens are handed out by `POST /user/token` and presented on every
/// authenticated request. They carry no claims; the server resolves them
/// to a user through the `auth_tokens` table.
///
/// # Format
///
/// 40 lowercase hex characters (20 random bytes from the thread RNG).
///
/// # Storage
///
/// Only the SHA-256 hash and a short display prefix are stored. The
/// plaintext is returned once and never again.
///
/// # Example
///
/// ```
/// use recipe_shared::auth::token::{generate_token, hash_token, validate_token_format};
///
/// let (token, hash) = generate_token();
/// assert_eq!(token.len(), 40);
/// assert!(validate_token_format(&token));
/// assert_eq!(hash, hash_token(&token));
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token
const TOKEN_BYTES: usize = 20;

/// Length of a token in hex characters
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Number of leading characters kept in clear for display
pub const TOKEN_PREFIX_LENGTH: usize = 8;

/// Generates a new token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_token(&token);

    (token, hash)
}

/// Hashes a token with SHA-256
///
/// Returns 64 hex characters. Deterministic, so lookups go by hash.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns the display prefix of a token
pub fn extract_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LENGTH).collect()
}

/// Checks that a string looks like a token before touching the database
pub fn validate_token_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Pulls the token out of an `Authorization` header value
///
/// Accepts `Bearer <token>` and the `Token <token>` scheme. The scheme
/// name is matched case-insensitively.
///
/// # Example
///
/// ```
/// use recipe_shared::auth::token::parse_authorization;
///
/// assert_eq!(parse_authorization("Bearer abc"), Some("abc"));
/// assert_eq!(parse_authorization("token abc"), Some("abc"));
/// assert_eq!(parse_authorization("Basic abc"), None);
/// ```
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, credentials) = header.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return None;
    }

    let credentials = credentials.trim();
    if credentials.is_empty() || credentials.contains(' ') {
        return None;
    }

    Some(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let (token, hash) = generate_token();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(validate_token_format(&token));
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token(&token));
    }

    #[test]
    fn test_generate_token_unique() {
        let (token1, _) = generate_token();
        let (token2, _) = generate_token();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_extract_prefix() {
        assert_eq!(extract_prefix("0123456789abcdef"), "01234567");
        assert_eq!(extract_prefix("abc"), "abc");
    }

    #[test]
    fn test_validate_token_format_rejects_garbage() {
        assert!(!validate_token_format(""));
        assert!(!validate_token_format("short"));
        assert!(!validate_token_format(&"z".repeat(TOKEN_LENGTH)));
        assert!(!validate_token_format(&"a".repeat(TOKEN_LENGTH + 1)));
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer  abc123 "), Some("abc123"));

        assert_eq!(parse_authorization("Bearer"), None);
        assert_eq!(parse_authorization("Bearer "), None);
        assert_eq!(parse_authorization("Bearer a b"), None);
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz"), None);
    }
}
