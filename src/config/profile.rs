use anyhow::{Context, Result};
use std::path::Path;

use crate::models::GapitCode;

/// Профиль устройства: `gapit_code` в отдельном файле (JSON или YAML)
pub struct Profile;

impl Profile {
    pub fn load(path: &str) -> Result<GapitCode> {
        let content = std::fs::read_to_string(path)
            .context(format!("Не удалось прочитать файл: {}", path))?;

        let is_json = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let code: GapitCode = if is_json {
            serde_json::from_str(&content).context("Не удалось распарсить JSON")?
        } else {
            serde_yml::from_str(&content).context("Не удалось распарсить YAML")?
        };

        if code.is_empty() {
            anyhow::bail!("Профиль '{}' пустой", path);
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_yaml_profile_and_rejects_empty() {
        let dir = std::env::temp_dir().join(format!("gapit-profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = dir.join("pdu.yaml");
        std::fs::write(
            &path,
            "objects:\n  - group_name: power\n    read_priority: 60\n    group:\n      - address: 1.3.6.1.x.1\n        description: voltage\n",
        )
        .unwrap();
        let code = Profile::load(path.to_str().unwrap()).unwrap();
        assert_eq!(code.0["objects"][0].group[0].description, "voltage");

        let empty = dir.join("empty.json");
        std::fs::write(&empty, "{}").unwrap();
        assert!(Profile::load(empty.to_str().unwrap()).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
