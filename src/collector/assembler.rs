use std::collections::BTreeMap;

use super::cache::NonexistentOids;
use super::types::VarbindRecord;
use crate::error::PollError;
use crate::models::{GapitCode, MetricValue};
use crate::scaling::Scaling;
use crate::snmp::{Varbind, VarbindValue, decode_counter64};

/// Результат сборки одного цикла
#[derive(Debug, Default)]
pub struct Assembled {
    pub gapit_results: GapitCode,
    pub oid_value_map: BTreeMap<String, MetricValue>,
    pub varbinds: Vec<VarbindRecord>,
}

/// Сборщик результата: раскладывает значения varbind'ов по дереву конфигурации
pub struct ResultAssembler<'a> {
    pub convert_counter64_to_number: bool,
    pub remove_novalue_items: bool,
    pub scaling: &'a mut dyn Scaling,
}

impl ResultAssembler<'_> {
    /// `tree` должен быть очищенной копией конфигурации (`GapitCode::cleaned`)
    pub fn assemble(
        &mut self,
        mut tree: GapitCode,
        varbinds: Vec<Varbind>,
        cache: &mut NonexistentOids,
    ) -> Result<Assembled, PollError> {
        let mut oid_value_map = BTreeMap::new();
        let mut records = Vec::with_capacity(varbinds.len());

        for vb in varbinds {
            if vb.value.is_absent() {
                tracing::warn!(oid = %vb.oid, kind = vb.value.type_name(), "OID отсутствует на устройстве");
                cache.mark_missing(&vb.oid);
                continue;
            }
            if vb.value.is_error() {
                tracing::error!(oid = %vb.oid, kind = vb.value.type_name(), "SNMPv2+ ошибка в varbind");
                continue;
            }

            let Some(value) = self.decode(&vb)? else {
                tracing::debug!(oid = %vb.oid, "Пустое значение (Null)");
                continue;
            };
            oid_value_map.insert(vb.oid.clone(), value.clone());
            records.push(VarbindRecord {
                oid: vb.oid,
                tstr: vb.value.type_name().to_string(),
                value,
            });
        }

        // порядок обхода = порядок в конфигурации, от него зависит сумма регистров
        for groups in tree.0.values_mut() {
            for group in groups.iter_mut() {
                for member in group.group.iter_mut() {
                    let Some(raw) = oid_value_map.get(&member.address) else {
                        continue;
                    };
                    let value = if member.is_string() {
                        raw.clone()
                    } else {
                        self.scaling.scale(
                            raw.clone(),
                            member.scaling_factor,
                            &member.unit,
                            &member.description,
                        )
                    };
                    member.value = Some(value);
                }

                if self.remove_novalue_items {
                    group.group.retain(|m| m.value.is_some());
                }
            }
        }

        Ok(Assembled {
            gapit_results: tree,
            oid_value_map,
            varbinds: records,
        })
    }

    fn decode(&self, vb: &Varbind) -> Result<Option<MetricValue>, PollError> {
        let value = match &vb.value {
            VarbindValue::Boolean(b) => MetricValue::Number(if *b { 1.0 } else { 0.0 }),
            VarbindValue::Integer(i) => MetricValue::Number(*i as f64),
            VarbindValue::OctetString(bytes) => {
                MetricValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
            VarbindValue::ObjectIdentifier(oid) => MetricValue::Text(oid.clone()),
            VarbindValue::IpAddress([a, b, c, d]) => MetricValue::Text(format!("{}.{}.{}.{}", a, b, c, d)),
            VarbindValue::Counter32(v) | VarbindValue::Unsigned32(v) | VarbindValue::TimeTicks(v) => {
                MetricValue::Number(*v as f64)
            }
            VarbindValue::Opaque(bytes) => {
                MetricValue::Text(bytes.iter().map(|b| format!("{:02x}", b)).collect())
            }
            VarbindValue::Counter64(buf) => {
                decode_counter64(&vb.oid, buf, self.convert_counter64_to_number)?
            }
            VarbindValue::Null
            | VarbindValue::NoSuchObject
            | VarbindValue::NoSuchInstance
            | VarbindValue::EndOfMibView => return Ok(None),
        };
        Ok(Some(value))
    }
}
