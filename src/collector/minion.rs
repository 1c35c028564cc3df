use crate::error::PollError;
use crate::models::GapitCode;
use crate::models::gapit::TEMPLATE_KEY;
use crate::snmp::canonical_oid;

/// Разбивает строку списка устройств/миньонов по разделителю
pub fn split_list(list: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        let item = list.trim();
        return if item.is_empty() {
            Vec::new()
        } else {
            vec![item.to_string()]
        };
    }
    list.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Размножает шаблон `objects` по устройствам.
///
/// Каждое устройство получает свою копию групп шаблона под своим именем.
/// Если задан id миньона, первое вхождение `placeholder` в адресе каждого
/// члена заменяется на этот id. Если после размножения ключей больше одного,
/// сам шаблон удаляется, чтобы не опрашивать его.
pub fn expand_minions(
    code: &GapitCode,
    device_names: &[String],
    minion_ids: &[String],
    placeholder: &str,
) -> Result<GapitCode, PollError> {
    if !minion_ids.is_empty() && minion_ids.len() != device_names.len() {
        return Err(PollError::Config(format!(
            "Количество устройств ({}) не совпадает с количеством миньонов ({})",
            device_names.len(),
            minion_ids.len()
        )));
    }

    let mut expanded = code.clone();
    if device_names.is_empty() {
        return Ok(expanded);
    }

    let Some(template) = code.0.get(TEMPLATE_KEY) else {
        tracing::warn!("Заданы имена устройств, но в конфигурации нет шаблона '{}'", TEMPLATE_KEY);
        return Ok(expanded);
    };

    for (idx, device) in device_names.iter().enumerate() {
        let mut groups = template.clone();
        if let Some(minion) = minion_ids.get(idx) {
            for member in groups.iter_mut().flat_map(|g| g.group.iter_mut()) {
                member.address = member.address.replacen(placeholder, minion, 1);
            }
        }
        tracing::debug!(device = %device, groups = groups.len(), "Шаблон размножен для устройства");
        expanded.0.insert(device.clone(), groups);
    }

    if expanded.0.len() > 1 {
        expanded.0.remove(TEMPLATE_KEY);
    }

    Ok(expanded)
}

/// Приводит адреса всех членов к канонической записи OID.
/// Вызывается после размножения: по этим адресам идут дедупликация, кэш и сборка
pub fn canonicalize_addresses(code: &mut GapitCode) {
    for member in code
        .0
        .values_mut()
        .flat_map(|groups| groups.iter_mut())
        .flat_map(|g| g.group.iter_mut())
    {
        let canonical = canonical_oid(&member.address);
        if canonical != member.address {
            tracing::debug!(address = %member.address, oid = %canonical, "Адрес приведён к канонической записи");
            member.address = canonical;
        }
    }
}
