use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub mod assembler;
pub mod cache;
pub mod minion;
pub mod query;
pub mod schedule;
pub mod types;

pub use assembler::ResultAssembler;
pub use cache::NonexistentOids;
pub use minion::{canonicalize_addresses, expand_minions, split_list};
pub use query::QueryEngine;
pub use schedule::ReadSchedule;
pub use types::{PollOutput, VarbindRecord};

use crate::config::{ConnectionSettings, NodeSettings};
use crate::context::ContextStore;
use crate::error::{PollError, Result};
use crate::formatter::InfluxBatchFormatter;
use crate::models::{GapitCode, InboundMessage};
use crate::scaling::ScalingEngine;
use crate::snmp::{SessionProvider, SessionTarget};

/// Узел опроса: конфигурация, состояние между циклами и движок масштабирования.
///
/// `poll` берёт `&mut self`, поэтому два цикла одного узла не могут идти
/// одновременно. Разные узлы полностью независимы.
pub struct PollerNode {
    settings: NodeSettings,
    defaults: ConnectionSettings,
    gapit_code: Option<GapitCode>,
    scaling: ScalingEngine,
    formatter: InfluxBatchFormatter,
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn ContextStore>,
}

impl PollerNode {
    pub fn new(
        settings: NodeSettings,
        defaults: ConnectionSettings,
        gapit_code: Option<GapitCode>,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn ContextStore>,
    ) -> Self {
        let scaling = ScalingEngine::new(
            &settings.scaling,
            settings.convert_counter64_bigint_to_number,
        );
        let formatter = InfluxBatchFormatter {
            db_tags: settings.db_tags.clone(),
            custom_tags: settings.custom_tags.clone(),
            tagname_device_name: settings.tagname_device_name.clone(),
            timestamp: settings.timestamp_source(),
        };

        Self {
            settings,
            defaults,
            gapit_code,
            scaling,
            formatter,
            sessions,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval.max(1))
    }

    /// Один цикл опроса. `Ok(None)` означает, что запрашивать было нечего
    pub async fn poll(&mut self, msg: &InboundMessage) -> Result<Option<PollOutput>> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.poll_at(msg, now).await
    }

    /// Цикл опроса с явным временем (epoch, секунды)
    pub async fn poll_at(&mut self, msg: &InboundMessage, now: u64) -> Result<Option<PollOutput>> {
        let target = self.session_target(msg)?;
        let code = msg
            .gapit_code
            .as_ref()
            .or(self.gapit_code.as_ref())
            .ok_or_else(|| PollError::Config(format!("Узел '{}': не задан gapit_code", self.settings.name)))?;

        let separator = &self.settings.minion_separator;
        let device_names = split_list(&self.settings.device_names, separator);
        let minion_ids = split_list(&self.settings.minion_ids, separator);
        let mut expanded = expand_minions(
            code,
            &device_names,
            &minion_ids,
            &self.settings.minion_placeholder,
        )?;
        canonicalize_addresses(&mut expanded);

        let store = self.store.as_ref();
        let mut cache = NonexistentOids::load(store, self.settings.skip_nonexistent_oids)?;
        let mut schedule = ReadSchedule::load(store)?;

        let mut oids = Vec::new();
        let mut seen = HashSet::new();
        // группа и её OID, оставшиеся после фильтра по кэшу
        let mut polled_groups = Vec::new();
        for (source_key, groups) in expanded.iter() {
            for group in groups {
                if !schedule.is_due(now, source_key, group) {
                    tracing::debug!(source = %source_key, group = %group.group_name, "Группа пропущена по расписанию");
                    continue;
                }

                let mut candidates = Vec::new();
                for member in &group.group {
                    if cache.is_known_missing(&member.address) {
                        continue;
                    }
                    candidates.push(member.address.as_str());
                    // агенты не принимают дубли OID в одном запросе
                    if seen.insert(member.address.as_str()) {
                        tracing::debug!(oid = %member.address, description = %member.description, "OID добавлен в запрос");
                        oids.push(member.address.clone());
                    }
                }
                polled_groups.push((source_key, group, candidates));
            }
        }

        if oids.is_empty() {
            tracing::warn!(node = %self.settings.name, "Нет OID для запроса");
            schedule.persist(store)?;
            return Ok(None);
        }

        let session = self.sessions.session(&target).await.map_err(|e| PollError::ProtocolFatal {
            host: target.host.clone(),
            message: e.to_string(),
        })?;

        let engine = QueryEngine::new(session, &target.host)
            .with_block_step(self.settings.oid_block_step)
            .with_concurrency(self.settings.individual_concurrency);

        let outcome = match engine.run(&oids, &mut cache).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // после таймаута или сбоя транспорта сессии доверять нельзя
                self.sessions.evict(&target).await;
                cache.persist(store)?;
                return Err(e);
            }
        };

        if let Some(block_size) = outcome.tuned_block_size {
            tracing::info!(
                node = %self.settings.name,
                block_size,
                unqueried = outcome.unqueried.len(),
                "Размер блока подобран"
            );
        }
        if !outcome.missing.is_empty() {
            tracing::info!(node = %self.settings.name, missing = outcome.missing.len(), "Агент отклонил часть OID");
        }

        // группы, все OID которых остались за пределами первого блока, не считаются прочитанными
        let unqueried: HashSet<&str> = outcome.unqueried.iter().map(String::as_str).collect();
        for (source_key, group, candidates) in &polled_groups {
            if candidates.is_empty() || candidates.iter().any(|oid| !unqueried.contains(oid)) {
                schedule.mark_polled(now, source_key, group);
            } else {
                tracing::debug!(source = %source_key, group = %group.group_name, "Группа не вошла в запрос");
            }
        }

        let mut assembler = ResultAssembler {
            convert_counter64_to_number: self.settings.convert_counter64_bigint_to_number,
            remove_novalue_items: self.settings.remove_novalue_items,
            scaling: &mut self.scaling,
        };
        let assembled = assembler.assemble(expanded.cleaned(), outcome.varbinds, &mut cache);

        cache.persist(store)?;
        let assembled = assembled?;
        let payload = self.formatter.to_measurements(&assembled.gapit_results, msg)?;
        // время следующего чтения сдвигается только после успешного цикла
        schedule.persist(store)?;

        tracing::info!(
            node = %self.settings.name,
            host = %target.host,
            requested = oids.len(),
            values = assembled.oid_value_map.len(),
            measurements = payload.len(),
            "Цикл опроса завершён"
        );

        Ok(Some(PollOutput {
            oid: oids,
            varbinds: assembled.varbinds,
            oid_value_map: assembled.oid_value_map,
            gapit_results: assembled.gapit_results,
            payload,
        }))
    }

    /// Хост и community узла; из сообщения берутся, только если у узла их нет
    fn session_target(&self, msg: &InboundMessage) -> Result<SessionTarget> {
        let host = self
            .settings
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| msg.host.clone())
            .ok_or_else(|| PollError::Config(format!("Узел '{}': не задан host", self.settings.name)))?;

        let community = self
            .settings
            .community
            .clone()
            .or_else(|| msg.community.clone())
            .unwrap_or_else(|| self.defaults.community.clone());

        Ok(SessionTarget {
            host,
            community,
            version: self.settings.version.unwrap_or(self.defaults.version),
            timeout: Duration::from_secs(self.settings.timeout.unwrap_or(self.defaults.timeout)),
        })
    }
}
