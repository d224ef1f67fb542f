use tracing::warn;

use super::agent::API_KEY_ENV;

const KEYRING_SERVICE: &str = "com.talentfinder.agent.model_api_key";
const KEYRING_USERNAME: &str = "default";

/// Model API key for the agent process, kept in the OS keychain.
pub struct ModelApiKeyStore;

impl Default for ModelApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelApiKeyStore {
    pub fn new() -> Self {
        Self
    }

    /// The environment variable wins over the keychain so CI and one-off runs
    /// need no keychain entry. Keychain failures are logged and treated as absent.
    pub fn resolve(&self) -> Option<String> {
        if let Ok(value) = std::env::var(API_KEY_ENV) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }

        match self.load() {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "could not read model API key from keychain");
                None
            }
        }
    }

    pub fn load(&self) -> anyhow::Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)?;
        let value = match entry.get_password() {
            Ok(v) => v,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if value.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    pub fn save(&self, key: &str) -> anyhow::Result<()> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)?;
        entry.set_password(trimmed)?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)?;
        match entry.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
