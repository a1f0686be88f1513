use std::env;
use std::str::FromStr;

use anyhow::anyhow;
use simplelog::LevelFilter;

use crate::services::arbiter::TurnPolicy;

// Runtime settings, read once at startup from the environment (and a .env file if present)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub http_port: u16,
    pub log_level: LevelFilter,
    pub hard_timeout_secs: i64,
    pub forfeit_grace_secs: i64,
    pub abandonment_streak: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            http_port: parse_var("HTTP_PORT", 3000)?,
            log_level: parse_var("LOG_LEVEL", LevelFilter::Debug)?,
            hard_timeout_secs: parse_var("HARD_TIMEOUT_SECS", 60)?,
            forfeit_grace_secs: parse_var("FORFEIT_GRACE_SECS", 2)?,
            abandonment_streak: parse_var("ABANDONMENT_STREAK", 5)?,
        })
    }

    pub fn turn_policy(&self) -> TurnPolicy {
        TurnPolicy {
            hard_timeout: chrono::Duration::seconds(self.hard_timeout_secs),
            forfeit_grace: chrono::Duration::seconds(self.forfeit_grace_secs),
            abandonment_streak: self.abandonment_streak,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow!("${} is not valid ({:?}): {}", name, value, err)),
        Err(_) => Ok(default),
    }
}
