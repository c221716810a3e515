const KEYRING_SERVICE: &str = "com.tgc.hse-screening.gemini";
const KEYRING_USERNAME: &str = "default";
const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Gemini API key storage in the OS keychain, with environment overrides.
pub struct GeminiApiKeyStore;

impl GeminiApiKeyStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variables win over the keychain so CI and scripts need no keychain access.
    pub fn resolve(&self) -> anyhow::Result<Option<String>> {
        if let Some(value) = api_key_from_env(|name| std::env::var(name).ok()) {
            return Ok(Some(value));
        }

        self.load()
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

    pub fn save(&self, api_key: &str) -> anyhow::Result<()> {
        let trimmed = api_key.trim();
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

impl Default for GeminiApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn api_key_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|&name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_variable_takes_precedence() {
        let key = api_key_from_env(|name| match name {
            "GEMINI_API_KEY" => Some("gemini-key".to_string()),
            "API_KEY" => Some("generic-key".to_string()),
            _ => None,
        });
        assert_eq!(key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let key = api_key_from_env(|name| match name {
            "GEMINI_API_KEY" => Some("   ".to_string()),
            "API_KEY" => Some(" generic-key ".to_string()),
            _ => None,
        });
        assert_eq!(key.as_deref(), Some("generic-key"));

        assert_eq!(api_key_from_env(|_| None), None);
    }

    #[test]
    fn masked_key_keeps_last_four_characters() {
        assert_eq!(mask_api_key("AIzaSyExample1234"), "*************1234");
        assert_eq!(mask_api_key("short"), "*****");
    }
}
