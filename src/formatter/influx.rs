use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::error::PollError;
use crate::models::{GapitCode, InboundMessage, MetricValue};

/// Запись для пакетной записи в InfluxDB
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, MetricValue>,
    /// Без timestamp InfluxDB ставит время приёма
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Number>,
}

/// Откуда брать timestamp measurement'ов
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// Время приёма на стороне InfluxDB
    #[default]
    Ingest,
    /// Числовое свойство входящего сообщения
    Property(String),
}

/// Преобразует дерево результатов в пакет measurement'ов
#[derive(Debug, Clone, Default)]
pub struct InfluxBatchFormatter {
    pub db_tags: BTreeMap<String, String>,
    /// Дополнительные теги по ключу источника (устройству)
    pub custom_tags: BTreeMap<String, BTreeMap<String, String>>,
    pub tagname_device_name: String,
    pub timestamp: TimestampSource,
}

impl InfluxBatchFormatter {
    pub fn to_measurements(
        &self,
        results: &GapitCode,
        msg: &InboundMessage,
    ) -> Result<Vec<Measurement>, PollError> {
        // группы без значений не попадают в пакет
        let groups: Vec<_> = results
            .iter()
            .flat_map(|(key, groups)| groups.iter().map(move |g| (key, g)))
            .filter(|(_, g)| g.has_values())
            .collect();

        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = self.resolve_timestamp(msg)?;

        Ok(groups
            .into_iter()
            .map(|(source_key, group)| {
                let mut tags = self.db_tags.clone();
                tags.insert(self.tagname_device_name.clone(), source_key.clone());
                if let Some(custom) = self.custom_tags.get(source_key) {
                    for (k, v) in custom {
                        tracing::trace!(tag = %k, value = %v, device = %source_key, "Добавлен тег устройства");
                        tags.insert(k.clone(), v.clone());
                    }
                }

                let fields = group
                    .group
                    .iter()
                    .filter_map(|m| Some((m.description.clone(), m.value.clone()?)))
                    .collect();

                Measurement {
                    measurement: group.group_name.clone(),
                    tags,
                    fields,
                    timestamp: timestamp.clone(),
                }
            })
            .collect())
    }

    fn resolve_timestamp(&self, msg: &InboundMessage) -> Result<Option<Number>, PollError> {
        let property = match &self.timestamp {
            TimestampSource::Ingest => return Ok(None),
            TimestampSource::Property(p) if p.trim().is_empty() => {
                return Err(PollError::Config(
                    "Timestamp берётся из сообщения, но имя свойства не задано".to_string(),
                ));
            }
            TimestampSource::Property(p) => p.trim(),
        };

        match msg.property(property) {
            Some(Value::Number(n)) => Ok(Some(n.clone())),
            Some(Value::String(s)) => parse_number(s).map(Some).ok_or_else(|| {
                PollError::Config(format!(
                    "Свойство сообщения '{}' не число (значение: {})",
                    property, s
                ))
            }),
            Some(other) => Err(PollError::Config(format!(
                "Свойство сообщения '{}' не число (значение: {})",
                property, other
            ))),
            None => Err(PollError::Config(format!(
                "Timestamp берётся из свойства сообщения '{}', но оно не задано",
                property
            ))),
        }
    }
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(n.into());
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n.into());
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> GapitCode {
        serde_json::from_str(
            r#"{
                "dev1": [
                    {"group_name": "power", "group": [
                        {"address": "1.1", "description": "voltage", "value": 230.5},
                        {"address": "1.2", "description": "current"}
                    ]},
                    {"group_name": "empty", "group": [
                        {"address": "1.3", "description": "x"}
                    ]}
                ],
                "dev2": [
                    {"group_name": "power", "group": [
                        {"address": "1.1", "description": "voltage", "value": 229}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    fn formatter() -> InfluxBatchFormatter {
        InfluxBatchFormatter {
            db_tags: BTreeMap::from([("site".to_string(), "oslo".to_string())]),
            custom_tags: BTreeMap::from([(
                "dev2".to_string(),
                BTreeMap::from([("rack".to_string(), "r7".to_string())]),
            )]),
            tagname_device_name: "device_name".to_string(),
            timestamp: TimestampSource::Ingest,
        }
    }

    #[test]
    fn one_measurement_per_group_with_values() {
        let batch = formatter()
            .to_measurements(&results(), &InboundMessage::default())
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].measurement, "power");
        assert_eq!(batch[0].tags["device_name"], "dev1");
        assert_eq!(batch[0].tags["site"], "oslo");
        assert_eq!(batch[0].fields.len(), 1);
        assert_eq!(batch[0].fields["voltage"], MetricValue::Number(230.5));
        assert!(batch[0].timestamp.is_none());

        assert_eq!(batch[1].tags["rack"], "r7");
        assert!(!batch[0].tags.contains_key("rack"));
    }

    #[test]
    fn timestamp_from_message_property() {
        let mut f = formatter();
        f.timestamp = TimestampSource::Property("ts".to_string());

        let msg: InboundMessage = serde_json::from_str(r#"{"ts": 1700000000000}"#).unwrap();
        let batch = f.to_measurements(&results(), &msg).unwrap();
        assert!(batch.iter().all(|m| m.timestamp == Some(1700000000000u64.into())));

        let msg: InboundMessage = serde_json::from_str(r#"{"ts": "1700000000"}"#).unwrap();
        let batch = f.to_measurements(&results(), &msg).unwrap();
        assert_eq!(batch[0].timestamp, Some(1700000000u64.into()));
    }

    #[test]
    fn missing_or_bad_timestamp_is_config_error() {
        let mut f = formatter();
        f.timestamp = TimestampSource::Property("ts".to_string());

        let err = f
            .to_measurements(&results(), &InboundMessage::default())
            .unwrap_err();
        assert!(matches!(err, PollError::Config(_)));

        let msg: InboundMessage = serde_json::from_str(r#"{"ts": "yesterday"}"#).unwrap();
        assert!(matches!(
            f.to_measurements(&results(), &msg),
            Err(PollError::Config(_))
        ));

        f.timestamp = TimestampSource::Property(" ".to_string());
        assert!(matches!(
            f.to_measurements(&results(), &msg),
            Err(PollError::Config(_))
        ));
    }

    #[test]
    fn serializes_without_empty_timestamp() {
        let batch = formatter()
            .to_measurements(&results(), &InboundMessage::default())
            .unwrap();
        let json = serde_json::to_value(&batch[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "measurement": "power",
                "tags": {"device_name": "dev1", "site": "oslo"},
                "fields": {"voltage": 230.5}
            })
        );
    }
}
