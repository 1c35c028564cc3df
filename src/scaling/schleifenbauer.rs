use std::collections::HashMap;

use super::general::{GeneralScaling, round8};
use super::Scaling;
use crate::models::MetricValue;

/// Значение, которое возвращается, если сумма регистров не собрана
pub const REGISTER_UNSET: f64 = -1.0;

const REGISTER_PREFIX: &str = "register";

/// Масштабирование для PDU Schleifenbauer.
///
/// Счётчики энергии приходят несколькими регистрами: члены группы с единицами
/// `register1`..`register3` запоминаются, член с `register4` получает их сумму.
/// Порядок членов в группе важен: регистры 1-3 должны быть обработаны раньше.
pub struct SchleifenbauerScaling {
    general: GeneralScaling,
    registers: HashMap<String, [Option<f64>; 3]>,
}

impl SchleifenbauerScaling {
    pub fn new(general: GeneralScaling) -> Self {
        Self {
            general,
            registers: HashMap::new(),
        }
    }

    fn accumulate(&mut self, value: MetricValue, unit: &str, field_name: &str) -> MetricValue {
        let slots = self
            .registers
            .entry(common_field_name(field_name))
            .or_insert([None; 3]);

        let slot = match unit {
            "register1" => Some(0),
            "register2" => Some(1),
            "register3" => Some(2),
            _ => None,
        };

        if let Some(idx) = slot {
            slots[idx] = value.as_f64();
            return value;
        }

        let sum = match slots {
            [Some(a), Some(b), Some(c)] => MetricValue::Number(round8(*a + *b + *c)),
            _ => {
                tracing::warn!(field = %field_name, "Не все регистры получены, сумма не посчитана");
                MetricValue::Number(REGISTER_UNSET)
            }
        };
        *slots = [None; 3];
        sum
    }
}

impl Scaling for SchleifenbauerScaling {
    fn scale(&mut self, value: MetricValue, factor: f64, unit: &str, field_name: &str) -> MetricValue {
        let scaled = self.general.apply(value, factor, field_name);
        if unit.starts_with(REGISTER_PREFIX) {
            self.accumulate(scaled, unit, field_name)
        } else {
            scaled
        }
    }
}

/// Описание без последнего слова: "kWh L1" -> "kWh"
fn common_field_name(field_name: &str) -> String {
    match field_name.rsplit_once(' ') {
        Some((head, _)) => head.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SchleifenbauerScaling {
        SchleifenbauerScaling::new(GeneralScaling::new(false))
    }

    #[test]
    fn sums_three_registers_and_resets() {
        let mut s = engine();
        assert_eq!(s.scale(10.0.into(), 1.0, "register1", "energy reg1"), MetricValue::Number(10.0));
        assert_eq!(s.scale(20.0.into(), 1.0, "register2", "energy reg2"), MetricValue::Number(20.0));
        assert_eq!(s.scale(30.0.into(), 1.0, "register3", "energy reg3"), MetricValue::Number(30.0));
        assert_eq!(s.scale(0.0.into(), 1.0, "register4", "energy total"), MetricValue::Number(60.0));

        // после суммы все слоты снова пустые
        assert_eq!(
            s.scale(0.0.into(), 1.0, "register4", "energy total"),
            MetricValue::Number(REGISTER_UNSET)
        );
    }

    #[test]
    fn missing_register_yields_sentinel_and_resets() {
        let mut s = engine();
        s.scale(10.0.into(), 1.0, "register1", "energy reg1");
        s.scale(30.0.into(), 1.0, "register3", "energy reg3");
        assert_eq!(
            s.scale(0.0.into(), 1.0, "register4", "energy total"),
            MetricValue::Number(REGISTER_UNSET)
        );

        s.scale(20.0.into(), 1.0, "register2", "energy reg2");
        assert_eq!(
            s.scale(0.0.into(), 1.0, "register4", "energy total"),
            MetricValue::Number(REGISTER_UNSET)
        );
    }

    #[test]
    fn registers_are_scaled_before_accumulation() {
        let mut s = engine();
        s.scale(100.0.into(), 0.1, "register1", "kWh a");
        s.scale(200.0.into(), 0.1, "register2", "kWh b");
        s.scale(300.0.into(), 0.1, "register3", "kWh c");
        assert_eq!(s.scale(0.0.into(), 1.0, "registerSum", "kWh sum"), MetricValue::Number(60.0));
    }

    #[test]
    fn separate_fields_do_not_share_registers() {
        let mut s = engine();
        for (unit, v) in [("register1", 1.0), ("register2", 2.0), ("register3", 3.0)] {
            s.scale(v.into(), 1.0, unit, "outlet1 x");
        }
        s.scale(5.0.into(), 1.0, "register1", "outlet2 x");
        assert_eq!(
            s.scale(0.0.into(), 1.0, "register4", "outlet2 total"),
            MetricValue::Number(REGISTER_UNSET)
        );
        assert_eq!(s.scale(0.0.into(), 1.0, "register4", "outlet1 total"), MetricValue::Number(6.0));
    }

    #[test]
    fn non_register_units_use_plain_scaling() {
        let mut s = engine();
        assert_eq!(s.scale(2305.0.into(), 0.1, "V", "voltage L1"), MetricValue::Number(230.5));
    }

    #[test]
    fn common_name_drops_last_word() {
        assert_eq!(common_field_name("active energy L1"), "active energy");
        assert_eq!(common_field_name("energy"), "");
    }
}
