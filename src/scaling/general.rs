use super::Scaling;
use crate::models::MetricValue;
use crate::models::value::MAX_SAFE_INTEGER;

/// Допуск при переводе дробного множителя в целый делитель
const DIVISOR_TOLERANCE: f64 = 1e-9;

/// Округление до 8 знаков, убирает артефакты вида 49.900000000000006
pub fn round8(x: f64) -> f64 {
    (x * 1e8).round() / 1e8
}

/// Простое масштабирование: умножение на `scaling_factor`
pub struct GeneralScaling {
    convert_counter64_to_number: bool,
}

impl GeneralScaling {
    pub fn new(convert_counter64_to_number: bool) -> Self {
        Self {
            convert_counter64_to_number,
        }
    }

    pub fn apply(&self, value: MetricValue, factor: f64, field_name: &str) -> MetricValue {
        if factor == 1.0 {
            return value;
        }

        match value {
            MetricValue::Number(n) => MetricValue::Number(round8(n * factor)),
            MetricValue::BigInt(n) => self.scale_big(n, factor, field_name),
            MetricValue::Text(s) => {
                tracing::warn!(field = %field_name, value = %s, "Значение не число, масштабирование пропущено");
                MetricValue::Text(s)
            }
        }
    }

    /// Целочисленное масштабирование Counter64: делим на 1/factor или умножаем на factor
    fn scale_big(&self, n: u64, factor: f64, field_name: &str) -> MetricValue {
        let scaled = if factor > 0.0 && factor < 1.0 {
            let inverse = 1.0 / factor;
            let divisor = inverse.round();
            if (inverse - divisor).abs() > DIVISOR_TOLERANCE * inverse || divisor < 1.0 {
                tracing::warn!(
                    field = %field_name,
                    factor,
                    "Множитель нельзя выразить целым делителем, масштабирование пропущено"
                );
                None
            } else {
                Some(n / divisor as u64)
            }
        } else if factor > 1.0 && factor.fract() == 0.0 {
            let scaled = n.checked_mul(factor as u64);
            if scaled.is_none() {
                tracing::warn!(field = %field_name, factor, "Переполнение u64 при масштабировании, значение без изменений");
            }
            scaled
        } else {
            tracing::warn!(
                field = %field_name,
                factor,
                "Множитель не подходит для целочисленного значения, масштабирование пропущено"
            );
            None
        };

        let result = scaled.unwrap_or(n);
        if self.convert_counter64_to_number && result <= MAX_SAFE_INTEGER {
            MetricValue::Number(result as f64)
        } else {
            MetricValue::BigInt(result)
        }
    }
}

impl Scaling for GeneralScaling {
    fn scale(&mut self, value: MetricValue, factor: f64, _unit: &str, field_name: &str) -> MetricValue {
        self.apply(value, factor, field_name)
    }
}
