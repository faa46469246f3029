//! Service configuration
//!
//! Layered, lowest precedence first: serde defaults, the YAML file,
//! `PLAYCALLER__SECTION__KEY` environment variables, then CLI flags.

use playcaller_models::ModelsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Secret used when none is configured; only fit for local development
pub const DEV_SECRET: &str = "dev-secret-key-change-me";

/// Upper bound on access token lifetime (366 days)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 366 * 24 * 60;

/// Environment variable prefix
const ENV_PREFIX: &str = "PLAYCALLER";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub models_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file, the environment and CLI overrides
    pub fn load(config_path: impl AsRef<Path>, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let path = config_path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_TOKEN_TTL_MINUTES).contains(&self.auth.token_ttl_minutes),
            "auth.token_ttl_minutes must be between 1 and {}, got {}",
            MAX_TOKEN_TTL_MINUTES,
            self.auth.token_ttl_minutes
        );
        anyhow::ensure!(!self.auth.secret.is_empty(), "auth.secret must not be empty");
        anyhow::ensure!(!self.database.url.trim().is_empty(), "database.url must not be empty");
        Ok(())
    }

    /// Apply CLI overrides on top of the loaded values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(listen) = &overrides.listen {
            self.server.listen = listen.clone();
        }

        if let Some(port) = overrides.port {
            self.server.port = port;
        }

        if let Some(dir) = &overrides.models_dir {
            self.models.dir = dir.clone();
        }
    }

    /// Whether the token secret is still the development default
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.secret == DEV_SECRET
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS; `*` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Credential issuing and access gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Access token lifetime
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,

    /// Header carrying the guest marker
    #[serde(default = "default_guest_header")]
    pub guest_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_ttl_minutes: default_token_ttl_minutes(),
            guest_header: default_guest_header(),
        }
    }
}

/// Account storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path or `sqlite:///` url; `:memory:` keeps accounts in memory
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://lovable.app".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_max_body_bytes() -> usize {
    16 * 1024
}

fn default_secret() -> String {
    DEV_SECRET.to_string()
}

fn default_token_ttl_minutes() -> i64 {
    60 * 24 * 7
}

fn default_guest_header() -> String {
    "x-guest".to_string()
}

fn default_database_url() -> String {
    "./playcaller.db".to_string()
}
