use serial_test::serial;
use std::env;

use workdocs::config::Config;

const KEYS: &[&str] = &[
    "DATABASE_URL",
    "JWT_SECRET",
    "JWT_EXPIRATION_DAYS",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "BASE_URL",
    "EXPIRY_SCAN_INTERVAL_SECS",
    "RATE_LIMIT_PER_MINUTE",
];

/// Runs `f` with the given variables set and every other config key cleared
fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
    let saved: Vec<(&str, Option<String>)> = KEYS.iter().map(|k| (*k, env::var(k).ok())).collect();

    unsafe {
        for key in KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    f();

    unsafe {
        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    with_env(&[], || {
        let config = Config::from_env_only().unwrap();

        assert_eq!(config.database_url, "postgres://@localhost:5432/workdocs");
        assert_eq!(config.jwt_expiration_days, 30);
        assert_eq!(config.server_address(), "127.0.0.1:8080");
        assert_eq!(config.environment, "development");
        assert_eq!(config.client_base_url, "http://localhost:3000");
        assert_eq!(config.expiry_scan_interval_secs, 3600);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert!(config.is_development());
    });
}

#[test]
#[serial]
fn test_config_custom_values() {
    with_env(
        &[
            ("DATABASE_URL", "postgres://app:secret@db:5432/docs"),
            ("JWT_SECRET", "another-secret"),
            ("JWT_EXPIRATION_DAYS", "7"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("ENVIRONMENT", "production"),
            ("EXPIRY_SCAN_INTERVAL_SECS", "60"),
            ("RATE_LIMIT_PER_MINUTE", "20"),
        ],
        || {
            let config = Config::from_env_only().unwrap();

            assert_eq!(config.database_url, "postgres://app:secret@db:5432/docs");
            assert_eq!(config.jwt_secret, "another-secret");
            assert_eq!(config.jwt_expiration_days, 7);
            assert_eq!(config.server_address(), "0.0.0.0:9000");
            assert!(config.is_production());
            assert_eq!(config.expiry_scan_interval_secs, 60);
            assert_eq!(config.rate_limit_per_minute, 20);
        },
    );
}

#[test]
#[serial]
fn test_config_invalid_numbers_fall_back() {
    with_env(
        &[("PORT", "not-a-port"), ("JWT_EXPIRATION_DAYS", "soon")],
        || {
            let config = Config::from_env_only().unwrap();
            assert_eq!(config.port, 8080);
            assert_eq!(config.jwt_expiration_days, 30);
        },
    );
}
