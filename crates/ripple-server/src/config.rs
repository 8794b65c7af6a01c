use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Origins allowed when RIPPLE_CORS_ORIGINS is unset — the usual local
/// frontend dev servers.
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8080",
];

/// Process-wide configuration, built once at startup and passed explicitly
/// to whatever needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let host = env::var("RIPPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env::var("RIPPLE_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .context("RIPPLE_PORT must be a port number")?;
        let db_path: PathBuf = env::var("RIPPLE_DB_PATH")
            .unwrap_or_else(|_| "ripple.db".into())
            .into();
        let jwt_secret =
            env::var("RIPPLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());

        let cors_origins = match env::var("RIPPLE_CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            cors_origins,
        })
    }
}
