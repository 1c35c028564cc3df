use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collector::query::{DEFAULT_BLOCK_STEP, DEFAULT_INDIVIDUAL_CONCURRENCY};
use crate::formatter::TimestampSource;
use crate::models::GapitCode;
use crate::snmp::SnmpVersion;

/// Базовые настройки приложения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Адрес HTTP сервера (health, ручной опрос)
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Каталог для контекста узлов
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Настройки подключения по умолчанию
    #[serde(default)]
    pub connection: ConnectionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Таймаут для SNMP операций (секунды)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default = "default_community")]
    pub community: String,
}

/// Настройки одного узла опроса
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    pub name: String,
    /// Хост агента, допускается `host:port`. Если пусто, берётся из сообщения
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub version: Option<SnmpVersion>,
    /// Таймаут запроса (секунды)
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Период опроса (секунды)
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Имя стратегии масштабирования
    #[serde(default = "default_scaling")]
    pub scaling: String,
    #[serde(default = "default_true")]
    pub skip_nonexistent_oids: bool,
    #[serde(default = "default_true")]
    pub remove_novalue_items: bool,
    #[serde(default)]
    pub convert_counter64_bigint_to_number: bool,

    /// Имена устройств через `minion_separator`
    #[serde(default)]
    pub device_names: String,
    /// Id миньонов через `minion_separator`, по одному на устройство
    #[serde(default)]
    pub minion_ids: String,
    #[serde(default = "default_separator")]
    pub minion_separator: String,
    #[serde(default = "default_placeholder")]
    pub minion_placeholder: String,

    #[serde(default)]
    pub db_tags: BTreeMap<String, String>,
    /// Теги по имени устройства
    #[serde(default)]
    pub custom_tags: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default = "default_tagname_device_name")]
    pub tagname_device_name: String,
    #[serde(default)]
    pub use_timestamp_from_msg: bool,
    #[serde(default)]
    pub timestamp_property: String,

    #[serde(default = "default_block_step")]
    pub oid_block_step: usize,
    #[serde(default = "default_concurrency")]
    pub individual_concurrency: usize,

    /// Конфигурация опроса прямо в файле
    #[serde(default)]
    pub gapit_code: Option<GapitCode>,
    /// Или путь к файлу профиля (JSON/YAML)
    #[serde(default)]
    pub profile: Option<String>,
}

impl NodeSettings {
    pub fn timestamp_source(&self) -> TimestampSource {
        if self.use_timestamp_from_msg {
            TimestampSource::Property(self.timestamp_property.trim().to_string())
        } else {
            TimestampSource::Ingest
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_state_dir() -> String {
    "./state".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_community() -> String {
    "public".to_string()
}

fn default_interval() -> u64 {
    10
}

fn default_scaling() -> String {
    "general".to_string()
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    ",".to_string()
}

fn default_placeholder() -> String {
    "x".to_string()
}

fn default_tagname_device_name() -> String {
    "device_name".to_string()
}

fn default_block_step() -> usize {
    DEFAULT_BLOCK_STEP
}

fn default_concurrency() -> usize {
    DEFAULT_INDIVIDUAL_CONCURRENCY
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            version: SnmpVersion::default(),
            community: default_community(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            state_dir: default_state_dir(),
            connection: ConnectionSettings::default(),
        }
    }
}
