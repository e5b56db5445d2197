//! Service configuration loaded from environment variables.
//!
//! | variable                 | default                                   |
//! |--------------------------|-------------------------------------------|
//! | `HOST`                   | `0.0.0.0`                                 |
//! | `PORT`                   | per binary (4004 customers, 4003 reservations) |
//! | `APP_ENV`                | `development` (`test`, `production`)      |
//! | `JWT_SECRET`             | dev secret; required in production        |
//! | `JWT_REFRESH_SECRET`     | dev secret; required in production        |
//! | `ACCESS_TOKEN_TTL_SECS`  | 3600                                      |
//! | `REFRESH_TOKEN_TTL_SECS` | 604800                                    |
//! | `REQUIRE_AUTH`           | true in production, false otherwise       |
//! | `DEFAULT_TENANT`         | `dev` outside production, unset otherwise |
//! | `TAX_RATE`               | 0.0744                                    |
//! | `RATE_LIMIT_PER_MINUTE`  | 600, 0 disables                           |
//!
//! Repository selection (`REPOSITORY_TYPE`, `DATABASE_URL`, `PG_*`) is read
//! by [`RepositoryBuilder::from_env`](crate::db::RepositoryBuilder::from_env).

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_TAX_RATE: f64 = 0.0744;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 600;
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 3600;

const DEV_JWT_SECRET: &str = "tailtown-dev-access-secret";
const DEV_JWT_REFRESH_SECRET: &str = "tailtown-dev-refresh-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        })
    }
}

/// Signing secrets and lifetimes for staff tokens.
#[derive(Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            access_secret: DEV_JWT_SECRET.to_string(),
            refresh_secret: DEV_JWT_REFRESH_SECRET.to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub jwt: JwtSettings,
    pub require_auth: bool,
    /// Tenant slug used when a request names no tenant.
    pub default_tenant: Option<String>,
    pub tax_rate: f64,
    /// Requests per tenant per minute; 0 disables limiting.
    pub rate_limit_per_minute: u32,
}

impl ServiceConfig {
    /// Development defaults for a service listening on `port`.
    pub fn new(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            environment: Environment::Development,
            jwt: JwtSettings::default(),
            require_auth: false,
            default_tenant: Some("dev".to_string()),
            tax_rate: DEFAULT_TAX_RATE,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }

    /// Read the configuration, using `default_port` when `PORT` is unset.
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        let environment = match std::env::var("APP_ENV") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "APP_ENV",
                value: v,
            })?,
            Err(_) => Environment::Development,
        };
        let production = environment.is_production();

        let access_secret = secret("JWT_SECRET", DEV_JWT_SECRET, production)?;
        let refresh_secret = secret("JWT_REFRESH_SECRET", DEV_JWT_REFRESH_SECRET, production)?;

        let default_tenant = match std::env::var("DEFAULT_TENANT") {
            Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
            Ok(_) => None,
            Err(_) if production => None,
            Err(_) => Some("dev".to_string()),
        };

        let tax_rate: f64 = parsed("TAX_RATE", DEFAULT_TAX_RATE)?;
        if !(0.0..1.0).contains(&tax_rate) {
            return Err(ConfigError::Invalid {
                key: "TAX_RATE",
                value: tax_rate.to_string(),
            });
        }

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", default_port)?,
            environment,
            jwt: JwtSettings {
                access_secret,
                refresh_secret,
                access_ttl_secs: parsed("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
                refresh_ttl_secs: parsed("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?,
            },
            require_auth: parsed_bool("REQUIRE_AUTH", production)?,
            default_tenant,
            tax_rate,
            rate_limit_per_minute: parsed("RATE_LIMIT_PER_MINUTE", DEFAULT_RATE_LIMIT_PER_MINUTE)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: raw,
        })
    }
}

fn secret(key: &'static str, dev_default: &str, production: bool) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ if production => Err(ConfigError::Missing(key)),
        _ => Ok(dev_default.to_string()),
    }
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        Err(_) => Ok(default),
    }
}

fn parsed_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_new_uses_development_defaults() {
        let config = ServiceConfig::new(4003);
        assert_eq!(config.port, 4003);
        assert!(!config.require_auth);
        assert_eq!(config.tax_rate, DEFAULT_TAX_RATE);
        assert_eq!(config.default_tenant.as_deref(), Some("dev"));
        assert_eq!(config.bind_addr().unwrap().port(), 4003);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", JwtSettings::default());
        assert!(!rendered.contains(DEV_JWT_SECRET));
        assert!(rendered.contains("redacted"));
    }
}
