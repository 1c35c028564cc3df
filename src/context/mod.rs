//! Хранилище контекста узла между циклами опроса.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Ключ множества отсутствующих OID
pub const KEY_NONEXISTENT_OIDS: &str = "nonexistent_oids";
/// Ключ расписания чтения групп
pub const KEY_NEXT_READ: &str = "next_read";

/// Key/value хранилище контекста одного узла
pub trait ContextStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn store(&self, key: &str, value: Value) -> Result<()>;
}

/// Контекст в памяти процесса
#[derive(Default)]
pub struct MemoryContextStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryContextStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("Мьютекс контекста отравлен"))?;
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("Мьютекс контекста отравлен"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Контекст в JSON файле (`<state_dir>/<node>.json`)
pub struct FileContextStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileContextStore {
    pub fn new(state_dir: impl AsRef<Path>, node_name: &str) -> Result<Self> {
        let dir = state_dir.as_ref();
        std::fs::create_dir_all(dir)
            .context(format!("Не удалось создать каталог состояния: {}", dir.display()))?;
        Ok(Self {
            path: dir.join(format!("{}.json", node_name)),
            lock: Mutex::new(()),
        })
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .context(format!("Не удалось прочитать файл: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .context(format!("Не удалось распарсить JSON: {}", self.path.display()))
    }
}

impl ContextStore for FileContextStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Мьютекс контекста отравлен"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Мьютекс контекста отравлен"))?;
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);
        let content = serde_json::to_string_pretty(&all)?;
        std::fs::write(&self.path, content)
            .context(format!("Не удалось записать файл: {}", self.path.display()))
    }
}
