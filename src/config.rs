use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_SURVEY_ID: &str = "bday-survey-2024";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub session_key: Vec<u8>,
    pub survey_id: String,
    pub login_rate_limit: usize,
    pub login_rate_window_secs: u64,
    /// Take the client address from `X-Forwarded-For` (only behind a proxy
    /// that overwrites it).
    pub trust_proxy: bool,
    pub secure_cookies: bool,
}

impl Config {
    /// Reads settings from the environment (after `dotenvy` has run).
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let session_key = match env::var("SESSION_KEY") {
            Ok(b64) => general_purpose::STANDARD
                .decode(b64.trim())
                .context("SESSION_KEY must be base64")?,
            Err(_) => {
                tracing::warn!("SESSION_KEY not set, using a random key");
                tracing::warn!("Sessions will not survive restarts");
                random_key()
            }
        };

        Ok(Self {
            bind_addr,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            session_key,
            survey_id: env::var("SURVEY_ID").unwrap_or_else(|_| DEFAULT_SURVEY_ID.to_string()),
            login_rate_limit: try_load("LOGIN_RATE_LIMIT", 5)?,
            login_rate_window_secs: try_load("LOGIN_RATE_WINDOW_SECS", 60)?,
            trust_proxy: try_load("TRUST_PROXY", false)?,
            secure_cookies: env::var("PRODUCTION").is_ok(),
        })
    }

    /// In-memory store and a fixed key.
    #[cfg(test)]
    pub fn local() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            session_key: b"local-development-session-key-32".to_vec(),
            survey_id: DEFAULT_SURVEY_ID.to_string(),
            login_rate_limit: 5,
            login_rate_window_secs: 60,
            trust_proxy: false,
            secure_cookies: false,
        }
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value: {raw}")),
        Err(_) => {
            tracing::debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn random_key() -> Vec<u8> {
    let mut key = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
