use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::context::{ContextStore, KEY_NEXT_READ};
use crate::models::{Group, ReadPriority};

/// Расписание чтения: ключ источника -> имя группы -> следующее время (epoch, с)
#[derive(Debug, Default)]
pub struct ReadSchedule {
    next_read: BTreeMap<String, BTreeMap<String, u64>>,
    dirty: bool,
}

impl ReadSchedule {
    pub fn load(store: &dyn ContextStore) -> Result<Self> {
        let next_read = match store.load(KEY_NEXT_READ)? {
            Some(value) => serde_json::from_value(value)
                .context("Некорректное расписание next_read в контексте")?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            next_read,
            dirty: false,
        })
    }

    /// Нужно ли читать группу сейчас. Новая группа получает время 0 и читается сразу
    pub fn is_due(&mut self, now: u64, source_key: &str, group: &Group) -> bool {
        let next = *self
            .next_read
            .entry(source_key.to_string())
            .or_default()
            .entry(group.group_name.clone())
            .or_insert_with(|| {
                self.dirty = true;
                0
            });

        match group.read_priority {
            ReadPriority::Never => false,
            ReadPriority::Seconds(_) => now >= next,
        }
    }

    /// Вызывается только для групп, которые реально вошли в запрос
    pub fn mark_polled(&mut self, now: u64, source_key: &str, group: &Group) {
        if let ReadPriority::Seconds(interval) = group.read_priority {
            self.next_read
                .entry(source_key.to_string())
                .or_default()
                .insert(group.group_name.clone(), now.saturating_add(interval));
            self.dirty = true;
        }
    }

    pub fn next_read(&self, source_key: &str, group_name: &str) -> Option<u64> {
        self.next_read.get(source_key)?.get(group_name).copied()
    }

    pub fn persist(&mut self, store: &dyn ContextStore) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        store.store(KEY_NEXT_READ, serde_json::to_value(&self.next_read)?)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryContextStore;

    fn group(name: &str, priority: ReadPriority) -> Group {
        Group {
            group_name: name.to_string(),
            read_priority: priority,
            group: Vec::new(),
            extra: Default::default(),
        }
    }

    #[test]
    fn group_is_due_again_after_interval() {
        let mut schedule = ReadSchedule::default();
        let g = group("power", ReadPriority::Seconds(60));

        assert!(schedule.is_due(1000, "dev1", &g));
        schedule.mark_polled(1000, "dev1", &g);
        assert!(!schedule.is_due(1000, "dev1", &g));
        assert!(!schedule.is_due(1059, "dev1", &g));
        assert!(schedule.is_due(1060, "dev1", &g));
    }

    #[test]
    fn never_group_is_never_due() {
        let mut schedule = ReadSchedule::default();
        let g = group("static", ReadPriority::Never);
        assert!(!schedule.is_due(0, "dev1", &g));
        assert!(!schedule.is_due(u64::MAX, "dev1", &g));
        assert_eq!(schedule.next_read("dev1", "static"), Some(0));
    }

    #[test]
    fn schedule_is_per_source_key() {
        let mut schedule = ReadSchedule::default();
        let g = group("power", ReadPriority::Seconds(30));
        schedule.mark_polled(100, "dev1", &g);
        assert!(!schedule.is_due(110, "dev1", &g));
        assert!(schedule.is_due(110, "dev2", &g));
    }

    #[test]
    fn persisted_schedule_survives_reload() {
        let store = MemoryContextStore::new();
        let g = group("power", ReadPriority::Seconds(60));

        let mut schedule = ReadSchedule::load(&store).unwrap();
        schedule.mark_polled(1000, "dev1", &g);
        schedule.persist(&store).unwrap();

        let mut reloaded = ReadSchedule::load(&store).unwrap();
        assert_eq!(reloaded.next_read("dev1", "power"), Some(1060));
        assert!(!reloaded.is_due(1030, "dev1", &g));
    }
}
