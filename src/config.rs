use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

pub const JWT_SECRET_ENV: &str = "POSTBOARD_JWT_SECRET";

/// Bounds bcrypt accepts for its work factor.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Upper bound for token and cookie lifetimes.
pub const MAX_SESSION_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(name = "postboard", about = "A small social posting server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the built single-page app
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Marks session cookies `Secure` and mirrors any CORS origin.
    pub production: bool,
    /// Origin allowed by CORS outside production.
    pub frontend_origin: String,
    pub static_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub jwt_secret: Option<String>,
    pub token_days: i64,
    pub cookie_days: i64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            production: false,
            frontend_origin: "http://localhost:5173".to_string(),
            static_dir: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            jwt_secret: None,
            token_days: 14,
            cookie_days: 7,
            bcrypt_cost: 10,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref dir) = cli.static_dir {
            config.server.static_dir = Some(dir.clone());
        }

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                config.auth.jwt_secret = Some(secret);
            }
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&config.auth.bcrypt_cost) {
            anyhow::bail!(
                "auth.bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            );
        }
        for (key, days) in [
            ("auth.token_days", config.auth.token_days),
            ("auth.cookie_days", config.auth.cookie_days),
        ] {
            if !(1..=MAX_SESSION_DAYS).contains(&days) {
                anyhow::bail!("{} must be between 1 and {}", key, MAX_SESSION_DAYS);
            }
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("postboard.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("uploads"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        if let Some(ref dir) = cli.data_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".postboard"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("postboard.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }
}
