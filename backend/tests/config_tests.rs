//! Tests for config module - reading service settings from the environment.

mod support;

use tailtown::config::{ConfigError, Environment, ServiceConfig, DEFAULT_TAX_RATE};

const ALL_KEYS: [&str; 11] = [
    "HOST",
    "PORT",
    "APP_ENV",
    "JWT_SECRET",
    "JWT_REFRESH_SECRET",
    "ACCESS_TOKEN_TTL_SECS",
    "REFRESH_TOKEN_TTL_SECS",
    "REQUIRE_AUTH",
    "DEFAULT_TENANT",
    "TAX_RATE",
    "RATE_LIMIT_PER_MINUTE",
];

/// Clear every service variable, then apply `overrides`.
fn with_env<R>(overrides: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let mut changes: Vec<(&str, Option<&str>)> = ALL_KEYS.iter().map(|k| (*k, None)).collect();
    for (key, value) in overrides {
        changes.retain(|(k, _)| k != key);
        changes.push((*key, Some(*value)));
    }
    support::with_scoped_env(&changes, f)
}

#[test]
fn test_development_defaults() {
    let config = with_env(&[], || ServiceConfig::from_env(4004)).unwrap();
    assert_eq!(config.port, 4004);
    assert_eq!(config.environment, Environment::Development);
    assert!(!config.require_auth);
    assert_eq!(config.default_tenant.as_deref(), Some("dev"));
    assert_eq!(config.tax_rate, DEFAULT_TAX_RATE);
    assert_eq!(config.rate_limit_per_minute, 600);
    assert_eq!(config.bind_addr().unwrap().port(), 4004);
}

#[test]
fn test_overrides() {
    let config = with_env(
        &[
            ("PORT", "9100"),
            ("HOST", "127.0.0.1"),
            ("TAX_RATE", "0.05"),
            ("REQUIRE_AUTH", "yes"),
            ("DEFAULT_TENANT", "seaside"),
            ("RATE_LIMIT_PER_MINUTE", "0"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
        ],
        || ServiceConfig::from_env(4003),
    )
    .unwrap();
    assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9100");
    assert_eq!(config.tax_rate, 0.05);
    assert!(config.require_auth);
    assert_eq!(config.default_tenant.as_deref(), Some("seaside"));
    assert_eq!(config.rate_limit_per_minute, 0);
    assert_eq!(config.jwt.access_ttl_secs, 60);
}

#[test]
fn test_production_requires_secrets() {
    let err = with_env(&[("APP_ENV", "production")], || ServiceConfig::from_env(4004)).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

    let config = with_env(
        &[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "b"),
        ],
        || ServiceConfig::from_env(4004),
    )
    .unwrap();
    assert!(config.is_production());
    assert!(config.require_auth);
    assert_eq!(config.default_tenant, None);
}

#[test]
fn test_invalid_values_are_reported() {
    let bad_port = with_env(&[("PORT", "eighty")], || ServiceConfig::from_env(4004)).unwrap_err();
    assert!(bad_port.to_string().contains("PORT"));

    let bad_tax = with_env(&[("TAX_RATE", "1.5")], || ServiceConfig::from_env(4004)).unwrap_err();
    assert!(matches!(bad_tax, ConfigError::Invalid { key: "TAX_RATE", .. }));

    let bad_flag = with_env(&[("REQUIRE_AUTH", "maybe")], || ServiceConfig::from_env(4004));
    assert!(bad_flag.is_err());

    let bad_env = with_env(&[("APP_ENV", "staging")], || ServiceConfig::from_env(4004));
    assert!(bad_env.is_err());
}
