/// Configuration management for the API server
///
/// Loaded from environment variables, with `.env` read first if present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8000)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `MEDIA_ROOT`: directory for uploaded files (default: ./media)
/// - `MEDIA_URL`: URL prefix for uploaded files (default: /media/)
/// - `MAX_UPLOAD_BYTES`: upload size limit (default: 10485760)
/// - `RUST_LOG`: Log filter (default: recipe_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use recipe_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Uploaded file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded files are written under
    pub root: PathBuf,

    /// URL prefix the files are served from
    pub url: String,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - A numeric or boolean variable has an invalid value
    /// - `MEDIA_URL` is the site root
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_port = var("API_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = parse_bool(&var("PRODUCTION", "false"))
            .ok_or_else(|| anyhow::anyhow!("PRODUCTION must be a boolean"))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let max_upload_bytes = var("MAX_UPLOAD_BYTES", "10485760")
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("MAX_UPLOAD_BYTES is invalid: {}", e))?;

        let media_url = var("MEDIA_URL", "/media/");
        if media_url.trim().trim_matches('/').is_empty() {
            anyhow::bail!("MEDIA_URL must name a path below the site root, e.g. /media/");
        }

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            media: MediaConfig {
                root: PathBuf::from(var("MEDIA_ROOT", "./media")),
                url: media_url,
                max_upload_bytes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Route prefix the media files are served under, e.g. `/media`
    pub fn media_route(&self) -> String {
        let trimmed = self.media.url.trim_end_matches('/');
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/app")])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.media.root, PathBuf::from("./media"));
        assert_eq!(config.media.url, "/media/");
        assert_eq!(config.media.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.media_route(), "/media");
    }

    #[test]
    fn test_database_url_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
            ("MEDIA_URL", "files"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.api.production);
        assert_eq!(config.media_route(), "/files");
        assert_eq!(config.media.max_upload_bytes, 1024);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("API_PORT", "http"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("PRODUCTION", "maybe"),
        ]))
        .is_err());
    }

    #[test]
    fn test_media_url_at_site_root_rejected() {
        for media_url in ["/", "//", "", " / "] {
            let err = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://db/app"),
                ("MEDIA_URL", media_url),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("MEDIA_URL"), "{media_url:?}: {err}");
        }
    }
}
