/// Ошибки цикла опроса, которые прерывают цикл без выдачи результата.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Ошибка конфигурации (несовпадение списков устройств/миньонов, нет поля timestamp и т.п.)
    #[error("Ошибка конфигурации: {0}")]
    Config(String),

    /// Неустранимая ошибка SNMP, повтор в рамках цикла не выполняется
    #[error("SNMP ошибка ({host}): {message}")]
    ProtocolFatal { host: String, message: String },

    /// Некорректный буфер Counter64
    #[error("Не удалось декодировать Counter64 для OID {oid}: длина буфера {len}")]
    Decode { oid: String, len: usize },

    /// Сбой хранилища контекста узла
    #[error("Ошибка хранилища контекста: {0}")]
    Context(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PollError>;
