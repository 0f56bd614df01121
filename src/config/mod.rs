use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

// Корневая конфигурация, по секции на каждую подсистему
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Required for the postgres backend only.
    pub url: Option<String>,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    /// Staff account ensured at startup when both are present.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

fn var_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

/// Token lifetime, at most a year.
const JWT_EXPIRY_HOURS: std::ops::RangeInclusive<i64> = 1..=8760;

fn jwt_expiry(value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|hours| JWT_EXPIRY_HOURS.contains(hours))
        .ok_or_else(|| ConfigError::Invalid {
            name: "JWT_EXPIRES_IN_HOURS",
            value: value.to_string(),
        })
}

fn optional_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_format = match var_or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let backend = match var_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let url = optional_var("DATABASE_URL");
        if backend == StoreBackend::Postgres && url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let secret = optional_var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let default_page_size: u32 = parse_var("PAGE_SIZE", "10")?;
        let max_page_size: u32 = parse_var("MAX_PAGE_SIZE", "100")?;
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::Invalid {
                name: "PAGE_SIZE",
                value: default_page_size.to_string(),
            });
        }

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "theatre_booking=debug,tower_http=debug"),
                log_format,
            },
            database: DatabaseConfig {
                backend,
                url,
                pool_size: parse_var("DB_POOL_SIZE", "20")?,
            },
            jwt: JwtConfig {
                secret,
                expires_in_hours: jwt_expiry(&var_or("JWT_EXPIRES_IN_HOURS", "24"))?,
            },
            auth: AuthConfig {
                bcrypt_cost: parse_var("BCRYPT_COST", "12")?,
                admin_email: optional_var("ADMIN_EMAIL"),
                admin_password: optional_var("ADMIN_PASSWORD"),
            },
            pagination: PaginationConfig {
                default_page_size,
                max_page_size,
            },
        })
    }

    /// Settings for tests and local runs against the memory store.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                rust_log: "theatre_booking=debug".to_string(),
                log_format: LogFormat::Pretty,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                pool_size: 1,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                expires_in_hours: 1,
            },
            auth: AuthConfig {
                // минимальный cost, который принимает bcrypt
                bcrypt_cost: 4,
                admin_email: None,
                admin_password: None,
            },
            pagination: PaginationConfig {
                default_page_size: 10,
                max_page_size: 100,
            },
        }
    }
}
