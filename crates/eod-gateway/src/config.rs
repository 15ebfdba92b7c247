//! ISS client configuration.

use serde::{Deserialize, Serialize};

/// MOEX ISS REST client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssConfig {
    /// ISS root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in milliseconds (single attempt, no retry).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Response language for titles ("ru" or "en").
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Upper bound of history pages followed through `history.cursor`.
    #[serde(default = "default_max_history_pages")]
    pub max_history_pages: u32,
}

fn default_base_url() -> String {
    "https://iss.moex.com/iss".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_lang() -> String {
    "ru".to_string()
}

fn default_max_history_pages() -> u32 {
    50
}

impl Default for IssConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            lang: default_lang(),
            max_history_pages: default_max_history_pages(),
        }
    }
}
