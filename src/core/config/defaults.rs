use crate::auth::IssuanceSettings;
use crate::core::config::data::Config;
use crate::core::dispatch::DispatchSettings;
use crate::core::keyring::DEFAULT_KEYRING_SERVICE;
use crate::utils::url::normalize_base_url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://cortex-v25-cloud-native.onrender.com";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_USER_TAG: &str = "cortex-os-user";
pub const DEFAULT_KEY_NAME: &str = "Cortex OS Client";
pub const DEFAULT_KEY_PURPOSE: &str = "cortex-os-frontend";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const BASE_URL_ENV_VAR: &str = "CORTEX_API_BASE_URL";

impl Config {
    /// Backend base URL: environment override, then config, then default.
    pub fn base_url(&self) -> String {
        let from_env = std::env::var(BASE_URL_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty());
        self.base_url_with_override(from_env.as_deref())
    }

    pub(crate) fn base_url_with_override(&self, override_url: Option<&str>) -> String {
        let raw = override_url
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL);
        normalize_base_url(raw)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn user_tag(&self) -> &str {
        self.user_tag.as_deref().unwrap_or(DEFAULT_USER_TAG)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn keyring_service(&self) -> &str {
        self.keyring_service
            .as_deref()
            .unwrap_or(DEFAULT_KEYRING_SERVICE)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_tokens: self.max_tokens(),
            user_tag: self.user_tag().to_string(),
            default_temperature: self.temperature(),
        }
    }

    pub fn issuance_settings(&self) -> IssuanceSettings {
        IssuanceSettings {
            key_name: self
                .key_name
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_NAME.to_string()),
            user_id: Some(self.user_tag().to_string()),
            purpose: Some(
                self.key_purpose
                    .clone()
                    .unwrap_or_else(|| DEFAULT_KEY_PURPOSE.to_string()),
            ),
        }
    }
}
