use std::path::PathBuf;

use anyhow::Context;

use super::models::RuntimeSettings;

pub struct SettingsStore {
    file_path: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            file_path: settings_path(),
        }
    }

    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }

    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.file_path, json).await?;
        Ok(())
    }
}

fn settings_path() -> PathBuf {
    app_data_root().join("talent-finder-settings.json")
}

pub fn app_data_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            return PathBuf::from(local_app_data).join("TalentFinder");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("TalentFinder");
        }
    }

    if let Some(path) = dirs::data_local_dir() {
        return path.join("TalentFinder");
    }

    PathBuf::from(".").join("TalentFinder")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(temp.path().join("settings.json"));
        let settings = store.load().await.unwrap();
        assert_eq!(settings.max_steps, 25);
        assert_eq!(settings.poll_iterations, 200);
    }

    #[tokio::test]
    async fn save_then_load_keeps_overrides() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(temp.path().join("nested").join("settings.json"));

        let settings = RuntimeSettings {
            max_steps: 40,
            default_locations: vec!["Chile".to_string(), "Peru".to_string()],
            ..RuntimeSettings::default()
        };
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.max_steps, 40);
        assert_eq!(loaded.default_locations, vec!["Chile", "Peru"]);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(SettingsStore::with_path(path).load().await.is_err());
    }
}
