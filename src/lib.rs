use config::{Config, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;

#[derive(Clone, Debug, Deserialize)]
pub struct CleanbookConfig {
    pub eventstore: EventStore,
    pub meilisearch: MeiliSearch,
    pub logger: Logger,
    pub web: Web,
}

impl CleanbookConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("cleanbook.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CLEANBOOK").separator("__"))
            .build()?
            .try_deserialize::<CleanbookConfig>()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventStore {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeiliSearch {
    pub url: String,
    pub api_key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

impl Logger {
    /// 設定されたレベルでtracingを初期化する
    pub fn init(&self) {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(&self.level))
            .init();
    }
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}

/// 管理APIの設定
#[derive(Clone, Debug, Deserialize)]
pub struct Web {
    pub bind: String,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    #[serde(default)]
    pub storage: Storage,
}

/// 予約データの保存先
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    EventStore,
    Memory,
}
