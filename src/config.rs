// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Number of integrity violations after which an attempt is force-submitted.
pub const DEFAULT_VIOLATION_THRESHOLD: i64 = 3;

/// Seconds a submission may arrive after the deadline before it is marked late.
pub const DEFAULT_SUBMIT_GRACE_SECONDS: i64 = 30;

/// Upper bound on an assessment's allotted time (one day).
pub const MAX_DURATION_SECONDS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub violation_threshold: i64,
    pub submit_grace_seconds: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://proctor.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let violation_threshold = env::var("VIOLATION_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_VIOLATION_THRESHOLD);

        let submit_grace_seconds = env::var("SUBMIT_GRACE_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .unwrap_or(DEFAULT_SUBMIT_GRACE_SECONDS);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            violation_threshold,
            submit_grace_seconds,
        }
    }

    /// Configuration used by tests: in-memory database, fixed secret.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: jwt_secret.to_string(),
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            violation_threshold: DEFAULT_VIOLATION_THRESHOLD,
            submit_grace_seconds: DEFAULT_SUBMIT_GRACE_SECONDS,
        }
    }
}
