//! Widget configuration from the environment

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8001/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub api_base_url: String,
    pub store_path: PathBuf,
    pub request_timeout: Duration,
    /// Navigation path the widget was loaded on, for entry-token extraction
    pub entry_path: Option<String>,
    /// Keep identity in memory only
    pub ephemeral: bool,
}

impl WidgetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("CHAT_WIDGET_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let store_path = lookup("CHAT_WIDGET_STORE_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".chat-widget").join("widget.db")
            },
            PathBuf::from,
        );

        // A zero timeout would fail every backend call
        let timeout_secs = match lookup("CHAT_WIDGET_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "Invalid CHAT_WIDGET_TIMEOUT_SECS, using default");
                    DEFAULT_TIMEOUT_SECS
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let ephemeral = lookup("CHAT_WIDGET_EPHEMERAL").is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        });

        Self {
            api_base_url,
            store_path,
            request_timeout: Duration::from_secs(timeout_secs),
            entry_path: lookup("CHAT_WIDGET_PATH"),
            ephemeral,
        }
    }
}
