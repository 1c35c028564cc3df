use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Наибольшее целое, которое точно представимо в f64 (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Значение метрики после декодирования и масштабирования
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    /// Целое вне безопасного диапазона f64 (Counter64)
    BigInt(u64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::BigInt(n) => Some(*n as f64),
            MetricValue::Text(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        MetricValue::Number(n)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // целые числа пишем без ".0"
            MetricValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 => {
                serializer.serialize_i64(*n as i64)
            }
            MetricValue::Number(n) => serializer.serialize_f64(*n),
            MetricValue::BigInt(n) => serializer.serialize_u64(*n),
            MetricValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Float(f64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Unsigned(n) if n > MAX_SAFE_INTEGER => MetricValue::BigInt(n),
            Raw::Unsigned(n) => MetricValue::Number(n as f64),
            Raw::Float(n) => MetricValue::Number(n),
            Raw::Text(s) => MetricValue::Text(s),
        })
    }
}
