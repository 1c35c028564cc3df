use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

use super::value::MetricValue;

/// Ключ шаблона, который размножается по устройствам
pub const TEMPLATE_KEY: &str = "objects";

/// Тип члена группы, который не масштабируется
pub const BYTE_TYPE_STR: &str = "STR";

/// Дерево конфигурации опроса (`gapit_code`): ключ источника -> группы
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GapitCode(pub BTreeMap<String, Vec<Group>>);

impl GapitCode {
    /// Копия дерева без служебных ключей (`next_read` у групп, `value` у членов)
    pub fn cleaned(&self) -> Self {
        let mut copy = self.clone();
        for group in copy.0.values_mut().flatten() {
            group.extra.remove("next_read");
            for member in &mut group.group {
                member.value = None;
            }
        }
        copy
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Group>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Группа членов, опрашиваемых и отправляемых одним measurement'ом
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_name: String,
    #[serde(default)]
    pub read_priority: ReadPriority,
    #[serde(default)]
    pub group: Vec<Member>,
    /// Прочие ключи сохраняются как есть
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Group {
    pub fn has_values(&self) -> bool {
        self.group.iter().any(|m| m.value.is_some())
    }
}

/// Одна метрика: OID, имя поля, кодировка и масштаб
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub address: String,
    pub description: String,
    #[serde(default)]
    pub byte_type: String,
    #[serde(
        default = "default_scaling_factor",
        deserialize_with = "number_or_string"
    )]
    pub scaling_factor: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MetricValue>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Member {
    pub fn is_string(&self) -> bool {
        self.byte_type == BYTE_TYPE_STR
    }
}

fn default_scaling_factor() -> f64 {
    1.0
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("scaling_factor вне диапазона f64")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("scaling_factor не число: {}", s))),
        other => Err(de::Error::custom(format!("scaling_factor не число: {}", other))),
    }
}

/// Интервал опроса группы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPriority {
    /// Группа не опрашивается
    Never,
    /// Интервал в секундах
    Seconds(u64),
}

impl Default for ReadPriority {
    fn default() -> Self {
        ReadPriority::Seconds(0)
    }
}

impl Serialize for ReadPriority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReadPriority::Never => serializer.serialize_str("never"),
            ReadPriority::Seconds(s) => serializer.serialize_u64(*s),
        }
    }
}

impl<'de> Deserialize<'de> for ReadPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s.trim().eq_ignore_ascii_case("never") => Ok(ReadPriority::Never),
            Value::String(s) => s
                .trim()
                .parse()
                .map(ReadPriority::Seconds)
                .map_err(|_| de::Error::custom(format!("read_priority: ожидалось \"never\" или число, получено \"{}\"", s))),
            Value::Number(n) => n
                .as_u64()
                .map(ReadPriority::Seconds)
                .ok_or_else(|| de::Error::custom(format!("read_priority должен быть неотрицательным целым: {}", n))),
            Value::Null => Ok(ReadPriority::default()),
            other => Err(de::Error::custom(format!("read_priority: неверный тип {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "objects": [
            {
                "group_name": "power",
                "read_priority": 60,
                "next_read": 1234,
                "group": [
                    {"address": "1.3.6.1.4.1.1.1", "description": "voltage", "byte_type": "INT",
                     "scaling_factor": "0.1", "unit": "V", "value": 230},
                    {"address": "1.3.6.1.4.1.1.2", "description": "name", "byte_type": "STR"}
                ]
            },
            {"group_name": "slow", "read_priority": "never", "group": []}
        ]
    }"#;

    #[test]
    fn parses_groups_and_members() {
        let code: GapitCode = serde_json::from_str(SAMPLE).unwrap();
        let groups = &code.0["objects"];
        assert_eq!(groups[0].read_priority, ReadPriority::Seconds(60));
        assert_eq!(groups[1].read_priority, ReadPriority::Never);
        assert_eq!(groups[0].group[0].scaling_factor, 0.1);
        assert_eq!(groups[0].group[1].scaling_factor, 1.0);
        assert!(groups[0].group[1].is_string());
    }

    #[test]
    fn cleaned_strips_runtime_keys_only() {
        let code: GapitCode = serde_json::from_str(SAMPLE).unwrap();
        let clean = code.cleaned();
        let group = &clean.0["objects"][0];
        assert!(!group.extra.contains_key("next_read"));
        assert!(group.group.iter().all(|m| m.value.is_none()));
        // исходное дерево не тронуто
        assert!(code.0["objects"][0].extra.contains_key("next_read"));
        assert_eq!(
            code.0["objects"][0].group[0].value,
            Some(MetricValue::Number(230.0))
        );
    }

    #[test]
    fn rejects_negative_read_priority() {
        let res: Result<ReadPriority, _> = serde_json::from_str("-5");
        assert!(res.is_err());
    }
}
