use serde::Serialize;
use std::collections::BTreeMap;

use crate::formatter::Measurement;
use crate::models::{GapitCode, MetricValue};

/// Varbind после фильтрации и декодирования
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarbindRecord {
    pub oid: String,
    /// Текстовое имя SNMP типа
    pub tstr: String,
    pub value: MetricValue,
}

/// Результат одного цикла опроса
#[derive(Debug, Clone, Serialize)]
pub struct PollOutput {
    /// Запрошенные OID
    pub oid: Vec<String>,
    pub varbinds: Vec<VarbindRecord>,
    pub oid_value_map: BTreeMap<String, MetricValue>,
    pub gapit_results: GapitCode,
    /// Пакет measurement'ов для InfluxDB
    pub payload: Vec<Measurement>,
}
