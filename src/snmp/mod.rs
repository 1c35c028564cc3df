use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod counter64;
pub mod oid;
pub mod session_pool;
pub mod v2c;

pub use counter64::decode_counter64;
pub use oid::{canonical_oid, parse_oid};
pub use session_pool::SessionPool;
pub use v2c::Snmp2Session;

/// Порт агента по умолчанию
pub const DEFAULT_PORT: u16 = 161;

/// Версия протокола SNMP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[default]
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2c")]
    V2c,
}

impl std::fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnmpVersion::V1 => write!(f, "1"),
            SnmpVersion::V2c => write!(f, "2c"),
        }
    }
}

/// Параметры подключения к агенту
#[derive(Debug, Clone)]
pub struct SessionTarget {
    /// Хост, допускается форма `host:port`
    pub host: String,
    pub community: String,
    pub version: SnmpVersion,
    pub timeout: Duration,
}

impl SessionTarget {
    /// Ключ для кэша сессий: host + community + version
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.host, self.community, self.version)
    }

    /// Адрес агента с портом (161, если порт не указан)
    pub fn address(&self) -> String {
        match self.host.split_once(':') {
            Some((host, port)) if !port.is_empty() => format!("{}:{}", host, port),
            Some((host, _)) => format!("{}:{}", host, DEFAULT_PORT),
            None => format!("{}:{}", self.host, DEFAULT_PORT),
        }
    }
}

/// Значение varbind'а в том виде, в котором его вернул агент
#[derive(Debug, Clone, PartialEq)]
pub enum VarbindValue {
    Boolean(bool),
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(String),
    IpAddress([u8; 4]),
    Counter32(u32),
    Unsigned32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    /// Сырой буфер big-endian, до 9 байт
    Counter64(Vec<u8>),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl VarbindValue {
    /// Текстовое имя типа (поле `tstr` в выходном сообщении)
    pub fn type_name(&self) -> &'static str {
        match self {
            VarbindValue::Boolean(_) => "Boolean",
            VarbindValue::Integer(_) => "Integer",
            VarbindValue::OctetString(_) => "OctetString",
            VarbindValue::Null => "Null",
            VarbindValue::ObjectIdentifier(_) => "OID",
            VarbindValue::IpAddress(_) => "IpAddress",
            VarbindValue::Counter32(_) => "Counter",
            VarbindValue::Unsigned32(_) => "Gauge",
            VarbindValue::TimeTicks(_) => "TimeTicks",
            VarbindValue::Opaque(_) => "Opaque",
            VarbindValue::Counter64(_) => "Counter64",
            VarbindValue::NoSuchObject => "NoSuchObject",
            VarbindValue::NoSuchInstance => "NoSuchInstance",
            VarbindValue::EndOfMibView => "EndOfMibView",
        }
    }

    /// OID отсутствует на устройстве
    pub fn is_absent(&self) -> bool {
        matches!(self, VarbindValue::NoSuchObject | VarbindValue::NoSuchInstance)
    }

    pub fn is_error(&self) -> bool {
        self.is_absent() || matches!(self, VarbindValue::EndOfMibView)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Varbind {
    pub oid: String,
    pub value: VarbindValue,
}

/// Ошибки одного SNMP запроса
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Агент отказал: ответ не помещается в одно сообщение
    #[error("RequestFailedError: TooBig")]
    TooBig,

    /// SNMPv1: один отсутствующий OID отклоняет весь запрос
    #[error("RequestFailedError: NoSuchName: {}", oid.as_deref().unwrap_or("?"))]
    NoSuchName { oid: Option<String> },

    #[error("RequestTimedOutError: нет ответа за {0:?}")]
    Timeout(Duration),

    #[error("RequestFailedError: status {status}, index {index}")]
    Status { status: u32, index: u32 },

    #[error("Невалидный OID: {0}")]
    InvalidOid(String),

    #[error("{0}")]
    Transport(String),
}

/// SNMP сессия с одним агентом: только GET набора OID
#[async_trait]
pub trait SnmpSession: Send + Sync {
    async fn get(&self, oids: &[String]) -> Result<Vec<Varbind>, SessionError>;
}

/// Источник сессий по параметрам подключения
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self, target: &SessionTarget) -> Result<Arc<dyn SnmpSession>, SessionError>;

    /// Забыть сессию после неустранимой ошибки, следующий цикл откроет новую
    async fn evict(&self, _target: &SessionTarget) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str) -> SessionTarget {
        SessionTarget {
            host: host.to_string(),
            community: "public".to_string(),
            version: SnmpVersion::V2c,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn address_uses_default_port() {
        assert_eq!(target("10.0.0.1").address(), "10.0.0.1:161");
        assert_eq!(target("10.0.0.1:1161").address(), "10.0.0.1:1161");
    }

    #[test]
    fn session_key_includes_community_and_version() {
        assert_eq!(target("10.0.0.1:1161").key(), "10.0.0.1:1161:public:2c");
    }

    #[test]
    fn version_deserializes_from_config_strings() {
        let v: SnmpVersion = serde_json::from_str("\"2c\"").unwrap();
        assert_eq!(v, SnmpVersion::V2c);
        let v: SnmpVersion = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(v, SnmpVersion::V1);
    }
}
