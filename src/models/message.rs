use serde::Deserialize;
use serde_json::{Map, Value};

use super::gapit::GapitCode;

/// Входящее сообщение одного цикла опроса
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    /// Используется, если у узла не задан host
    #[serde(default)]
    pub host: Option<String>,
    /// Используется, если у узла не задано community
    #[serde(default)]
    pub community: Option<String>,
    /// Заменяет конфигурацию узла на этот цикл
    #[serde(default)]
    pub gapit_code: Option<GapitCode>,
    /// Остальные свойства сообщения (например, поле с timestamp)
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl InboundMessage {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unknown_properties() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"host": "10.0.0.5", "ts": 1700000000000}"#).unwrap();
        assert_eq!(msg.host.as_deref(), Some("10.0.0.5"));
        assert!(msg.gapit_code.is_none());
        assert_eq!(msg.property("ts"), Some(&Value::from(1700000000000u64)));
    }
}
