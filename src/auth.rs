use anyhow::{anyhow, Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::env;

use crate::config::Config;

const SERVICE_NAME: &str = "slcli";
const USERNAME: &str = "credentials";

pub const API_URL_ENV: &str = "SYSTEMLINK_API_URL";
pub const API_KEY_ENV: &str = "SYSTEMLINK_API_KEY";
pub const WEB_URL_ENV: &str = "SYSTEMLINK_WEB_URL";
pub const NO_KEYCHAIN_ENV: &str = "SLCLI_NO_KEYCHAIN";

/// Server location and API key used for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

/// Where the active credentials came from
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    Environment,
    Keychain,
    ConfigFile,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Environment => {
                write!(f, "environment variables ({} / {})", API_URL_ENV, API_KEY_ENV)
            }
            CredentialSource::Keychain => write!(f, "system keychain"),
            CredentialSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Credentials along with their source
pub struct ResolvedCredentials {
    pub credentials: Credentials,
    pub source: CredentialSource,
}

/// Reads and writes credentials, optionally without touching the keychain
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    keychain_enabled: bool,
}

impl CredentialStore {
    pub fn new(keychain_enabled: bool) -> Self {
        Self { keychain_enabled }
    }

    /// Keychain is on unless `--no-keychain` or `SLCLI_NO_KEYCHAIN` says otherwise
    pub fn from_flags(no_keychain: bool) -> Self {
        let env_disabled = env::var(NO_KEYCHAIN_ENV)
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self::new(!(no_keychain || env_disabled))
    }

    pub fn keychain_enabled(&self) -> bool {
        self.keychain_enabled
    }

    /// Resolve credentials from environment, config file, then keychain
    pub fn resolve(&self, config: &Config) -> Result<ResolvedCredentials> {
        if let Some(credentials) = from_env() {
            return Ok(ResolvedCredentials {
                credentials,
                source: CredentialSource::Environment,
            });
        }

        if let (Some(api_url), Some(api_key)) = (&config.api_url, &config.api_key) {
            return Ok(ResolvedCredentials {
                credentials: Credentials {
                    api_url: api_url.clone(),
                    api_key: api_key.clone(),
                    web_url: config.web_url.clone(),
                },
                source: CredentialSource::ConfigFile,
            });
        }

        if self.keychain_enabled {
            match self.load_from_keychain() {
                Ok(credentials) => {
                    return Ok(ResolvedCredentials {
                        credentials,
                        source: CredentialSource::Keychain,
                    });
                }
                Err(e) => tracing::debug!("keychain lookup failed: {}", e),
            }
        }

        Err(anyhow!("No credentials found"))
    }

    fn entry(&self) -> Result<Entry> {
        if !self.keychain_enabled {
            return Err(anyhow!("Keychain access disabled"));
        }
        Entry::new(SERVICE_NAME, USERNAME)
            .context("Failed to create keychain entry - keychain may not be available")
    }

    /// Get credentials specifically from the keychain
    pub fn load_from_keychain(&self) -> Result<Credentials> {
        let secret = self.entry()?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => anyhow!("No credentials stored in keychain"),
            keyring::Error::Ambiguous(_) => anyhow!(
                "Multiple keychain entries found - please run 'slcli auth logout' and re-login"
            ),
            keyring::Error::PlatformFailure(ref msg) => anyhow!("Keychain platform error: {}", msg),
            keyring::Error::NoStorageAccess(ref msg) => anyhow!("Keychain access denied: {}", msg),
            _ => anyhow!("Keychain error: {}", e),
        })?;
        serde_json::from_str(&secret).context("Keychain entry is not valid slcli credentials")
    }

    /// Store credentials in the keychain
    pub fn store_in_keychain(&self, credentials: &Credentials) -> Result<()> {
        let secret = serde_json::to_string(credentials)?;
        self.entry()?.set_password(&secret).map_err(|e| match e {
            keyring::Error::PlatformFailure(ref msg) => anyhow!(
                "Keychain platform error: {}. Try 'slcli auth login --config-file' instead.",
                msg
            ),
            keyring::Error::NoStorageAccess(ref msg) => {
                anyhow!("Keychain access denied: {}. Check your system keychain settings.", msg)
            }
            _ => anyhow!("Failed to store credentials in keychain: {}", e),
        })
    }

    /// Store credentials in the config file (less secure)
    pub fn store_in_config(&self, credentials: &Credentials) -> Result<()> {
        let mut config = Config::load().context("Failed to load config")?;
        config.api_url = Some(credentials.api_url.clone());
        config.api_key = Some(credentials.api_key.clone());
        config.web_url = credentials.web_url.clone();
        config.save().context("Failed to save config file")
    }

    /// Remove credentials from both keychain and config file
    pub fn remove(&self) -> Result<()> {
        let mut removed_any = false;
        let mut errors = Vec::new();

        if self.keychain_enabled {
            match self.entry().and_then(|entry| {
                entry.delete_credential().map_err(|e| match e {
                    keyring::Error::NoEntry => anyhow!("No credentials in keychain"),
                    _ => anyhow!("Failed to remove from keychain: {}", e),
                })
            }) {
                Ok(_) => removed_any = true,
                Err(e) => errors.push(format!("keychain: {}", e)),
            }
        }

        let mut config = Config::load().context("Failed to load config")?;
        if config.has_credentials() {
            config.remove_credentials();
            config.save().context("Failed to save config")?;
            removed_any = true;
        } else {
            errors.push("config: no credentials in config file".to_string());
        }

        if removed_any {
            Ok(())
        } else {
            Err(anyhow!("Nothing to remove ({})", errors.join(", ")))
        }
    }
}

fn from_env() -> Option<Credentials> {
    let api_url = env::var(API_URL_ENV).ok().filter(|v| !v.is_empty())?;
    let api_key = env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty())?;
    Some(Credentials {
        api_url,
        api_key,
        web_url: env::var(WEB_URL_ENV).ok().filter(|v| !v.is_empty()),
    })
}

/// Show the first and last few characters of a secret
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("abcdefghijklmnop"), "abcd...mnop");
    }

    #[test]
    fn test_config_credentials_used_without_keychain() {
        let store = CredentialStore::new(false);
        let config = Config {
            api_url: Some("https://example.com".into()),
            api_key: Some("k".into()),
            ..Config::default()
        };
        // Environment wins when set, so only assert on the config path when it isn't.
        if env::var(API_URL_ENV).is_err() {
            let resolved = store.resolve(&config).unwrap();
            assert_eq!(resolved.source, CredentialSource::ConfigFile);
            assert_eq!(resolved.credentials.api_key, "k");
        }
    }

    #[test]
    fn test_disabled_keychain_refuses_access() {
        let store = CredentialStore::new(false);
        assert!(store.load_from_keychain().is_err());
    }

    #[test]
    fn test_credentials_json_shape() {
        let creds = Credentials {
            api_url: "https://example.com".into(),
            api_key: "k".into(),
            web_url: None,
        };
        let json = serde_json::to_string(&creds).unwrap();
        assert_eq!(json, r#"{"api_url":"https://example.com","api_key":"k"}"#);
    }
}
