use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub mod profile;
pub mod settings;

pub use profile::Profile;
pub use settings::{ConnectionSettings, NodeSettings, Settings};

use crate::models::GapitCode;

/// Главная конфигурация приложения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Базовые настройки
    #[serde(default)]
    pub settings: Settings,
    /// Узлы опроса
    #[serde(default)]
    pub nodes: Vec<NodeSettings>,
}

impl AppConfig {
    /// Загружает конфигурацию из YAML файла
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Не удалось прочитать файл: {}", path.display()))?;
        let config: AppConfig =
            serde_yml::from_str(&content).context("Не удалось распарсить YAML")?;

        if config.nodes.is_empty() {
            anyhow::bail!("В конфигурации '{}' нет ни одного узла", path.display());
        }

        Ok(config)
    }

    /// Получает адрес HTTP сервера из переменной окружения или из настроек
    pub fn get_listen(&self) -> String {
        env::var("GAPIT_LISTEN").unwrap_or_else(|_| self.settings.listen.clone())
    }

    /// Каталог состояния узлов
    pub fn get_state_dir(&self) -> String {
        env::var("GAPIT_STATE_DIR").unwrap_or_else(|_| self.settings.state_dir.clone())
    }

    /// Получает timeout из переменной окружения или из настроек
    pub fn get_timeout(&self) -> u64 {
        env::var("SNMP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.settings.connection.timeout)
    }

    /// Community по умолчанию для узлов без своего
    pub fn get_community(&self) -> String {
        env::var("SNMP_COMMUNITY").unwrap_or_else(|_| self.settings.connection.community.clone())
    }

    /// Настройки подключения по умолчанию с учётом переменных окружения
    pub fn connection_defaults(&self) -> ConnectionSettings {
        ConnectionSettings {
            timeout: self.get_timeout(),
            version: self.settings.connection.version,
            community: self.get_community(),
        }
    }

    /// Конфигурация опроса узла: inline `gapit_code` или файл профиля
    pub fn node_gapit_code(node: &NodeSettings) -> Result<Option<GapitCode>> {
        match (&node.gapit_code, &node.profile) {
            (Some(code), _) => Ok(Some(code.clone())),
            (None, Some(path)) => Profile::load(path)
                .map(Some)
                .context(format!("Профиль узла '{}'", node.name)),
            (None, None) => Ok(None),
        }
    }

    pub fn debug_config(&self) {
        tracing::info!(
            listen = %self.get_listen(),
            state_dir = %self.get_state_dir(),
            timeout = self.get_timeout(),
            nodes = self.nodes.len(),
            "Конфигурация загружена"
        );
        for node in &self.nodes {
            tracing::info!(
                node = %node.name,
                host = node.host.as_deref().unwrap_or("<из сообщения>"),
                interval = node.interval,
                scaling = %node.scaling,
                "Узел опроса"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let yaml = r#"
settings:
  listen: "127.0.0.1:9000"
  connection:
    timeout: 3
    version: "2c"
nodes:
  - name: pdu
    host: 10.0.0.5
    scaling: schleifenbauer
    device_names: "dev1, dev2"
    minion_ids: "5,7"
    custom_tags:
      dev1:
        rack: r1
    gapit_code:
      objects:
        - group_name: power
          read_priority: never
          group:
            - address: 1.3.6.1.x.1
              description: voltage
              scaling_factor: 0.1
"#;
        let config: AppConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.settings.connection.timeout, 3);
        let node = &config.nodes[0];
        assert_eq!(node.custom_tags["dev1"]["rack"], "r1");
        let code = AppConfig::node_gapit_code(node).unwrap().unwrap();
        assert_eq!(code.0["objects"][0].group[0].scaling_factor, 0.1);
    }
}
