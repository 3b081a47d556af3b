use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use tracing::info;

use foodgram_types::limits::{Bounds, DEFAULT_MAX_QUANTITY, DEFAULT_MIN_QUANTITY, Limits};

/// Secrets that ship in sample `.env` files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["", "changeme", "change-me", "secret", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub limits: Limits,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("FOODGRAM_JWT_SECRET").context("FOODGRAM_JWT_SECRET must be set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("FOODGRAM_JWT_SECRET is a placeholder; set a real secret");
        }

        let token_ttl_days: i64 = parse(&lookup, "FOODGRAM_TOKEN_TTL_DAYS", 30)?;
        if token_ttl_days < 1 {
            bail!("FOODGRAM_TOKEN_TTL_DAYS must be at least 1");
        }

        let max_cooking_time = parse(&lookup, "FOODGRAM_MAX_COOKING_TIME", DEFAULT_MAX_QUANTITY)?;
        let max_amount = parse(&lookup, "FOODGRAM_MAX_AMOUNT", DEFAULT_MAX_QUANTITY)?;
        if max_cooking_time < DEFAULT_MIN_QUANTITY || max_amount < DEFAULT_MIN_QUANTITY {
            bail!("FOODGRAM_MAX_COOKING_TIME and FOODGRAM_MAX_AMOUNT must be at least {}", DEFAULT_MIN_QUANTITY);
        }

        Ok(Self {
            host: lookup("FOODGRAM_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&lookup, "FOODGRAM_PORT", 8000)?,
            db_path: lookup("FOODGRAM_DB_PATH").unwrap_or_else(|| "foodgram.db".into()).into(),
            media_dir: lookup("FOODGRAM_MEDIA_DIR").unwrap_or_else(|| "./media".into()).into(),
            jwt_secret,
            token_ttl_days,
            limits: Limits {
                cooking_time: Bounds::new(DEFAULT_MIN_QUANTITY, max_cooking_time),
                amount: Bounds::new(DEFAULT_MIN_QUANTITY, max_amount),
            },
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("Invalid {} value '{}'", key, raw)),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
