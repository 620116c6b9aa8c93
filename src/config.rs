use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Which credential store backs the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StoreConfig {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("USER_STORE")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreConfig::Memory,
            "postgres" => StoreConfig::Postgres {
                database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            },
            other => anyhow::bail!("unknown USER_STORE {other:?}, expected postgres or memory"),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "herbal-sprinkler".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "herbal-sprinkler-app".into()),
            ttl_days: parse_ttl_days(std::env::var("JWT_TTL_DAYS").ok().as_deref())?,
        };

        let environment = match std::env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let port = std::env::var("APP_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("APP_PORT must be a port number")?
            .unwrap_or(3000);

        Ok(Self {
            store,
            jwt,
            environment,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            cors_allowed_origins: parse_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
        })
    }
}

pub const MAX_TTL_DAYS: i64 = 3650;

fn parse_ttl_days(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(7);
    };
    let days = raw
        .parse::<i64>()
        .with_context(|| format!("JWT_TTL_DAYS must be a whole number of days, got {raw:?}"))?;
    if !(1..=MAX_TTL_DAYS).contains(&days) {
        anyhow::bail!("JWT_TTL_DAYS must be between 1 and {MAX_TTL_DAYS}, got {days}");
    }
    Ok(days)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
