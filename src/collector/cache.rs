use anyhow::{Context, Result};
use std::collections::BTreeSet;

use crate::context::{ContextStore, KEY_NONEXISTENT_OIDS};

/// OID, которых заведомо нет на устройстве.
///
/// Множество только растёт: OID, признанный отсутствующим, больше не
/// запрашивается, пока контекст узла не очищен снаружи.
#[derive(Debug, Default)]
pub struct NonexistentOids {
    enabled: bool,
    oids: BTreeSet<String>,
    dirty: bool,
}

impl NonexistentOids {
    /// Пустой кэш; при `enabled == false` ничего не пропускается и не запоминается
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Загружает кэш из контекста узла
    pub fn load(store: &dyn ContextStore, enabled: bool) -> Result<Self> {
        let mut cache = Self::new(enabled);
        if let Some(value) = store.load(KEY_NONEXISTENT_OIDS)? {
            let oids: Vec<String> = serde_json::from_value(value)
                .context("Некорректный список nonexistent_oids в контексте")?;
            cache.oids.extend(oids);
        }
        Ok(cache)
    }

    pub fn is_known_missing(&self, oid: &str) -> bool {
        self.enabled && self.oids.contains(oid)
    }

    /// Запоминает отсутствующий OID. Возвращает true, если он новый
    pub fn mark_missing(&mut self, oid: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let added = self.oids.insert(oid.to_string());
        if added {
            tracing::info!(oid = %oid, "OID добавлен в список отсутствующих");
            self.dirty = true;
        }
        added
    }

    /// Пишет кэш в контекст, только если он менялся с прошлой записи
    pub fn persist(&mut self, store: &dyn ContextStore) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let oids: Vec<&String> = self.oids.iter().collect();
        store.store(KEY_NONEXISTENT_OIDS, serde_json::to_value(oids)?)?;
        self.dirty = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}
