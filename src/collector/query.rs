use futures::stream::{self, StreamExt};
use std::sync::Arc;

use super::cache::NonexistentOids;
use crate::error::PollError;
use crate::snmp::{SessionError, SnmpSession, Varbind};

/// Шаг уменьшения блока OID при ответе "too big"
pub const DEFAULT_BLOCK_STEP: usize = 10;
/// Сколько поштучных запросов может быть в полёте одновременно
pub const DEFAULT_INDIVIDUAL_CONCURRENCY: usize = 4;

/// Состояние движка запросов в пределах одного цикла
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Один запрос на весь список
    Initial,
    /// Подбор размера блока после "too big"
    Tuning { block_size: usize },
    /// Поштучные запросы после NoSuchName (SNMPv1)
    Individual,
}

/// Итог опроса
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub varbinds: Vec<Varbind>,
    /// Размер блока, на котором агент перестал отвечать "too big"
    pub tuned_block_size: Option<usize>,
    /// OID за пределами первого блока, не запрошенные в этом цикле
    pub unqueried: Vec<String>,
    /// OID, отклонённые агентом при поштучном опросе
    pub missing: Vec<String>,
}

/// Начальный размер блока: длина списка минус шаг, вниз до кратного шагу
pub fn initial_block_size(len: usize, step: usize) -> usize {
    let step = step.max(1);
    (len.saturating_sub(step) / step) * step
}

/// Движок пакетных запросов с подбором размера блока.
///
/// "too big" и NoSuchName обрабатываются здесь и наружу не выходят,
/// всё остальное завершает цикл ошибкой `ProtocolFatal`.
///
/// Подбор размера блока находит рабочий размер только для первого блока:
/// оставшиеся OID в этом цикле не запрашиваются (см. `QueryOutcome::unqueried`).
pub struct QueryEngine {
    session: Arc<dyn SnmpSession>,
    host: String,
    step: usize,
    concurrency: usize,
}

impl QueryEngine {
    pub fn new(session: Arc<dyn SnmpSession>, host: &str) -> Self {
        Self {
            session,
            host: host.to_string(),
            step: DEFAULT_BLOCK_STEP,
            concurrency: DEFAULT_INDIVIDUAL_CONCURRENCY,
        }
    }

    pub fn with_block_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Опрашивает `oids` (уже без дублей и без известных отсутствующих)
    pub async fn run(
        &self,
        oids: &[String],
        cache: &mut NonexistentOids,
    ) -> Result<QueryOutcome, PollError> {
        let mut state = QueryState::Initial;

        loop {
            let request = match state {
                QueryState::Tuning { block_size } => &oids[..block_size],
                _ => oids,
            };

            match self.session.get(request).await {
                Ok(varbinds) => {
                    let mut outcome = QueryOutcome {
                        varbinds,
                        ..Default::default()
                    };
                    if let QueryState::Tuning { block_size } = state {
                        outcome.tuned_block_size = Some(block_size);
                        outcome.unqueried = oids[block_size..].to_vec();
                        tracing::warn!(
                            host = %self.host,
                            block_size,
                            unqueried = outcome.unqueried.len(),
                            "Найден рабочий размер блока, остальные OID в этом цикле не запрошены"
                        );
                    }
                    return Ok(outcome);
                }
                Err(SessionError::TooBig) => {
                    let next = match state {
                        QueryState::Tuning { block_size } => block_size.saturating_sub(self.step),
                        _ => initial_block_size(oids.len(), self.step),
                    };
                    if next == 0 {
                        return Err(self.fatal(format!(
                            "агент отвечает \"too big\" даже на блок из {} OID",
                            request.len()
                        )));
                    }
                    tracing::warn!(host = %self.host, requested = request.len(), block_size = next, "Запрос слишком большой, уменьшаем блок");
                    state = QueryState::Tuning { block_size: next };
                }
                Err(SessionError::NoSuchName { oid }) => {
                    tracing::warn!(
                        host = %self.host,
                        oid = oid.as_deref().unwrap_or("?"),
                        count = request.len(),
                        "NoSuchName, переходим к поштучным запросам"
                    );
                    let (varbinds, missing) = self.query_individually(request).await?;
                    for oid in &missing {
                        cache.mark_missing(oid);
                    }

                    let mut outcome = QueryOutcome {
                        varbinds,
                        missing,
                        ..Default::default()
                    };
                    if let QueryState::Tuning { block_size } = state {
                        outcome.tuned_block_size = Some(block_size);
                        outcome.unqueried = oids[block_size..].to_vec();
                    }
                    return Ok(outcome);
                }
                Err(e) => return Err(self.fatal(e.to_string())),
            }
        }
    }

    /// Один запрос на каждый OID. Ответы приходят в любом порядке,
    /// результат собирается только после завершения всех запросов.
    async fn query_individually(
        &self,
        oids: &[String],
    ) -> Result<(Vec<Varbind>, Vec<String>), PollError> {
        let session = &self.session;
        let mut results: Vec<(usize, String, Result<Vec<Varbind>, SessionError>)> =
            stream::iter(oids.iter().cloned().enumerate())
                .map(|(idx, oid)| async move {
                    let res = session.get(std::slice::from_ref(&oid)).await;
                    (idx, oid, res)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        debug_assert_eq!(results.len(), oids.len());
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut varbinds = Vec::with_capacity(results.len());
        let mut missing = Vec::new();
        for (_, oid, res) in results {
            match res {
                Ok(vbs) => varbinds.extend(vbs),
                Err(SessionError::NoSuchName { .. }) => {
                    tracing::warn!(host = %self.host, oid = %oid, "OID отсутствует на устройстве");
                    missing.push(oid);
                }
                Err(e) => return Err(self.fatal(format!("{} (OID {})", e, oid))),
            }
        }

        Ok((varbinds, missing))
    }

    fn fatal(&self, message: String) -> PollError {
        PollError::ProtocolFatal {
            host: self.host.clone(),
            message,
        }
    }
}
