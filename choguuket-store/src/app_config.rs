use choguuket_shared::Masked;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub telegram: TelegramConfig,
    pub intake: IntakeConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Masked<String>,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    pub statement_timeout_ms: u64,
    /// Trips departing within this many minutes either side of the desired time match.
    pub search_window_minutes: i64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    pub fn search_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.search_window_minutes)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: Option<Masked<String>>,
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Masked<String>,
    pub api_url: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub create_trip_webapp_url: String,
    pub search_trip_webapp_url: String,
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    /// Pause between "trip created" and the trip summary.
    pub trip_summary_delay_ms: u64,
    /// Pause between "searching" and the search results.
    pub search_delay_ms: u64,
    pub page_size: usize,
    pub max_in_flight: usize,
    /// Offset used when rendering times to users.
    pub utc_offset_minutes: i32,
}

impl IntakeConfig {
    pub fn trip_summary_delay(&self) -> Duration {
        Duration::from_millis(self.trip_summary_delay_ms)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpConfig {
    /// When set, `/notify` and `/exists` require `Authorization: Bearer <token>`.
    pub auth_token: Option<Masked<String>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. CHOGUUKET__TELEGRAM__TOKEN=...
            .add_source(config::Environment::with_prefix("CHOGUUKET").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
