//! Масштабирование значений после опроса.
//!
//! Стратегия выбирается по имени из конфигурации узла. Неизвестное имя не
//! ошибка: пишем предупреждение и используем `general`.

use crate::models::MetricValue;

pub mod general;
pub mod schleifenbauer;

pub use general::GeneralScaling;
pub use schleifenbauer::SchleifenbauerScaling;

/// Стратегия масштабирования одного значения
pub trait Scaling: Send {
    /// `field_name` это описание члена группы, `unit` его единица измерения
    fn scale(&mut self, value: MetricValue, factor: f64, unit: &str, field_name: &str) -> MetricValue;
}

/// Известные стратегии
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    General,
    Schleifenbauer,
}

impl StrategyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "general" => Some(StrategyKind::General),
            "schleifenbauer" => Some(StrategyKind::Schleifenbauer),
            _ => None,
        }
    }
}

enum Strategy {
    General(GeneralScaling),
    Schleifenbauer(SchleifenbauerScaling),
}

/// Движок масштабирования, один на узел опроса (состояние регистров не общее)
pub struct ScalingEngine {
    kind: StrategyKind,
    strategy: Strategy,
}

impl ScalingEngine {
    pub fn new(name: &str, convert_counter64_to_number: bool) -> Self {
        let kind = StrategyKind::from_name(name).unwrap_or_else(|| {
            tracing::warn!(strategy = %name, "Неизвестная стратегия масштабирования, используем general");
            StrategyKind::General
        });

        let general = GeneralScaling::new(convert_counter64_to_number);
        let strategy = match kind {
            StrategyKind::General => Strategy::General(general),
            StrategyKind::Schleifenbauer => Strategy::Schleifenbauer(SchleifenbauerScaling::new(general)),
        };

        Self { kind, strategy }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }
}

impl Scaling for ScalingEngine {
    fn scale(&mut self, value: MetricValue, factor: f64, unit: &str, field_name: &str) -> MetricValue {
        match &mut self.strategy {
            Strategy::General(s) => s.scale(value, factor, unit, field_name),
            Strategy::Schleifenbauer(s) => s.scale(value, factor, unit, field_name),
        }
    }
}
