use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InstanceEnvironment {
    Production,
    Development,
    Test,
}

/// How this lab instance introduces itself to the main server.
#[derive(Debug, Clone)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub name: String,
    pub port: u16,
    pub description: String,
    pub main_server_url: String,
    pub environment: InstanceEnvironment,
}

impl InstanceIdentity {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.instance_id.trim().is_empty() {
            errors.push("INSTANCE_ID is required and cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("INSTANCE_NAME is required and cannot be empty".to_string());
        }
        if self.port < 1000 {
            errors.push("INSTANCE_PORT must be between 1000 and 65535".to_string());
        }
        if !self.main_server_url.starts_with("http") {
            errors.push("MAIN_SERVER_URL must be a URL starting with http".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_timeout: Duration,

    // Rate limiting
    pub rate_public_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub lab_settings_path: String,

    pub instance: InstanceIdentity,
    pub heartbeat: HeartbeatSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let server_addr = required("SERVER_ADDR")?;
        let default_port = server_addr
            .rsplit(':')
            .next()
            .unwrap_or("3000")
            .to_string();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            db_timeout: Duration::from_secs(or_default("DB_TIMEOUT_SECS", "5")?),

            rate_public_per_min: or_default("RATE_PUBLIC_PER_MIN", "120")?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: or_default("API_PREFIX", "/api")?,
            lab_settings_path: or_default("LAB_SETTINGS_PATH", "lab-settings.json")?,

            instance: InstanceIdentity {
                instance_id: or_default("INSTANCE_ID", "LAB_01")?,
                name: or_default("INSTANCE_NAME", "Computer laboratory")?,
                port: or_default("INSTANCE_PORT", &default_port)?,
                description: or_default("INSTANCE_DESCRIPTION", "Computer laboratory")?,
                main_server_url: or_default("MAIN_SERVER_URL", "http://127.0.0.1:3002")?,
                environment: or_default("INSTANCE_ENVIRONMENT", "development")?,
            },

            heartbeat: HeartbeatSettings {
                enabled: or_default("HEARTBEAT_ENABLED", "true")?,
                interval: Duration::from_secs(or_default("HEARTBEAT_INTERVAL_SECS", "15")?),
                timeout: Duration::from_secs(or_default("HEARTBEAT_TIMEOUT_SECS", "10")?),
            },

            server_addr,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}"))
}
