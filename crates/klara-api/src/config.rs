use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub mongodb: MongoDbConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamSection,
    pub chat: ChatSection,
    pub audit: AuditSection,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub upstream_token: String,
    #[serde(default)]
    pub audit_database_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// "memory" or "redis"
    pub backend: String,
    #[serde(default)]
    pub redis_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSection {
    /// Full endpoint URL of the upstream chat API. A placeholder value
    /// keeps the service in fallback-only mode.
    pub base_url: String,
    pub max_context_chunks: u32,
    pub health_interval_secs: u64,
    pub health_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSection {
    pub history_limit: usize,
    pub follow_up_probability: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    pub enabled: bool,
    /// Selects the audit table (klara_chat_log_{environment}).
    pub environment: String,
    pub auto_create_table: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, MONGODB_, CACHE_, UPSTREAM_,
    ///    CHAT_, AUDIT_, LOG_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        for prefix in ["SERVER", "MONGODB", "CACHE", "UPSTREAM", "CHAT", "AUDIT", "LOG"] {
            builder = builder.add_source(
                Environment::default()
                    .prefix(prefix)
                    .separator("_")
                    .try_parsing(true),
            );
        }

        let config = builder.build()?;
        let mut cfg: Config = config.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.mongodb_uri = std::env::var("MONGODB_URI").map_err(|_| {
            ConfigError::Message("MONGODB_URI environment variable is required".to_string())
        })?;
        cfg.upstream_token = std::env::var("KLARA_UPSTREAM_TOKEN").unwrap_or_default();
        cfg.audit_database_url = std::env::var("AUDIT_DATABASE_URL").unwrap_or_default();

        if cfg.audit.enabled && cfg.audit_database_url.is_empty() {
            return Err(ConfigError::Message(
                "AUDIT_DATABASE_URL is required when audit logging is enabled".to_string(),
            ));
        }

        Ok(cfg)
    }
}
