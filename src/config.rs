// Application configuration loaded from the environment

use std::str::FromStr;

/// Default session token lifetime (24 hours)
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 86_400;

/// Configuration errors raised while reading the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings for the API server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Session token lifetime in seconds
    pub token_ttl_seconds: i64,
    /// Argon2 time cost (iterations)
    pub password_hash_iterations: u32,
    /// Argon2 memory cost in KiB
    pub password_hash_memory_kib: u32,
    pub min_password_length: usize,
    /// Accept a bare principal id on the socket `authenticate` step.
    /// Off by default: clients must present their session token.
    pub allow_unverified_socket_binding: bool,
}

impl AppConfig {
    /// Read configuration from environment variables
    ///
    /// `dotenv` should already have been applied by the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let config = Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret,
            token_ttl_seconds: parse_or(&lookup, "TOKEN_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?,
            password_hash_iterations: parse_or(&lookup, "PASSWORD_HASH_ITERATIONS", 2)?,
            password_hash_memory_kib: parse_or(&lookup, "PASSWORD_HASH_MEMORY_KIB", 19_456)?,
            min_password_length: parse_or(&lookup, "MIN_PASSWORD_LENGTH", 8)?,
            allow_unverified_socket_binding: parse_or(
                &lookup,
                "ALLOW_UNVERIFIED_SOCKET_BINDING",
                false,
            )?,
        };

        if config.token_ttl_seconds <= 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_TTL_SECONDS",
                value: config.token_ttl_seconds.to_string(),
            });
        }

        Ok(config)
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}
