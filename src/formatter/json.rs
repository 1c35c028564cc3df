use serde::Serialize;

use crate::collector::PollOutput;

/// Компактная сводка цикла для логов и HTTP ответа
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub requested_oids: usize,
    pub returned_values: usize,
    pub measurements: usize,
}

/// JSON форматтер для результатов опроса
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn summary(output: &PollOutput) -> ResultSummary {
        ResultSummary {
            requested_oids: output.oid.len(),
            returned_values: output.oid_value_map.len(),
            measurements: output.payload.len(),
        }
    }

    /// Пакет measurement'ов одной строкой (для вывода построчно)
    pub fn payload_compact(output: &PollOutput) -> anyhow::Result<String> {
        serde_json::to_string(&output.payload)
            .map_err(|e| anyhow::anyhow!("Ошибка сериализации в JSON: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Measurement;
    use crate::models::MetricValue;
    use std::collections::BTreeMap;

    fn output() -> PollOutput {
        let mut fields = BTreeMap::new();
        fields.insert("voltage".to_string(), MetricValue::Number(230.5));
        PollOutput {
            oid: vec!["1.1".into(), "1.2".into()],
            varbinds: Vec::new(),
            oid_value_map: BTreeMap::from([("1.1".to_string(), MetricValue::Number(2305.0))]),
            gapit_results: Default::default(),
            payload: vec![Measurement {
                measurement: "power".into(),
                tags: BTreeMap::from([("device_name".to_string(), "pdu1".to_string())]),
                fields,
                timestamp: None,
            }],
        }
    }

    #[test]
    fn summary_counts_requested_and_returned() {
        let s = JsonFormatter::summary(&output());
        assert_eq!(s.requested_oids, 2);
        assert_eq!(s.returned_values, 1);
        assert_eq!(s.measurements, 1);
    }

    #[test]
    fn payload_is_single_line_without_timestamp() {
        let json = JsonFormatter::payload_compact(&output()).unwrap();
        assert!(!json.contains('\n'));
        assert_eq!(
            json,
            r#"[{"measurement":"power","tags":{"device_name":"pdu1"},"fields":{"voltage":230.5}}]"#
        );
    }
}
