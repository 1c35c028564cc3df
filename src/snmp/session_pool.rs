use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SessionError, SessionProvider, SessionTarget, Snmp2Session, SnmpSession};

/// Общий кэш SNMP сессий, ключ: host + community + version.
///
/// Разные узлы, опрашивающие один агент, используют одну сессию.
#[derive(Default)]
pub struct SessionPool {
    sessions: Mutex<HashMap<String, Arc<dyn SnmpSession>>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for SessionPool {
    async fn session(&self, target: &SessionTarget) -> Result<Arc<dyn SnmpSession>, SessionError> {
        let key = target.key();
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(&key) {
            return Ok(Arc::clone(session));
        }

        let session: Arc<dyn SnmpSession> = Arc::new(Snmp2Session::connect(target).await?);
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    async fn evict(&self, target: &SessionTarget) {
        if self.sessions.lock().await.remove(&target.key()).is_some() {
            tracing::debug!(key = %target.key(), "SNMP сессия удалена из кэша");
        }
    }
}
