use thiserror::Error;

const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. The in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty or `*` means permissive.
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt = JwtConfig {
            secret,
            issuer: non_empty("JWT_ISSUER").unwrap_or_else(|| "taskboard".into()),
            audience: non_empty("JWT_AUDIENCE").unwrap_or_else(|| "taskboard-users".into()),
            ttl_minutes: parse_or(
                "JWT_TTL_MINUTES",
                non_empty("JWT_TTL_MINUTES"),
                DEFAULT_TTL_MINUTES,
            )?,
        };
        if jwt.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_MINUTES",
                value: jwt.ttl_minutes.to_string(),
            });
        }

        let cors_origins = non_empty("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                non_empty("DB_MAX_CONNECTIONS"),
                10,
            )?,
            host: non_empty("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("APP_PORT", non_empty("APP_PORT"), 5000)?,
            cors_origins,
            jwt,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
