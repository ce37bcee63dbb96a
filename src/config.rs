use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;

use crate::auth::token::DEFAULT_TOKEN_TTL_HOURS;

const DEV_JWT_SECRET: &str = "gridstore-dev-secret";
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Command-line overrides; each flag wins over its environment variable.
#[derive(Debug, Default, Parser)]
#[command(name = "gridstore", version, about = "Dynamic table backend")]
pub struct Cli {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for table and user snapshots; in-memory only when unset
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("APP_PORT must be a valid u16")?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string());

        let token_ttl_hours = parse_token_ttl(
            &env::var("TOKEN_TTL_HOURS").unwrap_or_else(|_| DEFAULT_TOKEN_TTL_HOURS.to_string()),
        )?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .context("BCRYPT_COST must be a valid u32")?;
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31");
        }

        let data_dir = env::var("DATA_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            bcrypt_cost,
            data_dir,
        })
    }

    pub fn with_overrides(mut self, cli: Cli) -> Self {
        if let Some(host) = cli.host {
            self.host = host;
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(data_dir) = cli.data_dir {
            self.data_dir = Some(data_dir);
        }
        self
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }
}

fn parse_token_ttl(raw: &str) -> Result<i64> {
    let hours = raw
        .trim()
        .parse::<i64>()
        .context("TOKEN_TTL_HOURS must be a valid integer")?;
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        anyhow::bail!("TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}");
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            host: "0.0.0.0".into(),
            port: 5000,
            jwt_secret: DEV_JWT_SECRET.into(),
            token_ttl_hours: 24,
            bcrypt_cost: 4,
            data_dir: None,
        }
    }

    #[test]
    fn cli_flags_override_environment() {
        let cli = Cli::parse_from(["gridstore", "--port", "8081", "--data-dir", "/tmp/grid"]);
        let config = base().with_overrides(cli);
        assert_eq!(config.address(), "0.0.0.0:8081");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/grid")));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn token_ttl_is_bounded() {
        assert_eq!(parse_token_ttl("24").unwrap(), 24);
        assert_eq!(parse_token_ttl(" 8784 ").unwrap(), MAX_TOKEN_TTL_HOURS);
        assert!(parse_token_ttl("0").is_err());
        assert!(parse_token_ttl("-3").is_err());
        assert!(parse_token_ttl("9223372036854775807").is_err());
        assert!(parse_token_ttl("soon").is_err());
        assert_eq!(base().token_ttl(), Duration::hours(24));
    }

    #[test]
    fn absent_flags_keep_environment_values() {
        let config = base().with_overrides(Cli::default());
        assert_eq!(config.port, 5000);
        assert!(config.data_dir.is_none());
    }
}
