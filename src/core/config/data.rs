use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk client configuration. Every field is optional; see
/// `defaults.rs` for the values used when a field is absent.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL (overridden by `CORTEX_API_BASE_URL`)
    pub base_url: Option<String>,
    /// Response-length cap sent with every completion request
    pub max_tokens: Option<u32>,
    /// Sampling temperature used when the caller does not pick one
    pub temperature: Option<f32>,
    /// Value of the `user` field on completions and `user_id` on key issuance
    pub user_tag: Option<String>,
    /// Name given to issued API keys
    pub key_name: Option<String>,
    /// `metadata.purpose` attached to issued API keys
    pub key_purpose: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Keyring service under which both secrets are stored
    pub keyring_service: Option<String>,
}

/// Render a path for messages, abbreviating the home directory as `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
