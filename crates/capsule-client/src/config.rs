//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts with zero
//! configuration; without a store URL it runs against an in-memory store.

use std::path::PathBuf;
use std::time::Duration;

use capsule_shared::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, GATE_SECRET, PRESENCE_API_URL, PRESENCE_POLL_INTERVAL_MS,
};
use directories::UserDirs;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote content store.
    /// Env: `SUPABASE_URL` (or `NEXT_PUBLIC_SUPABASE_URL`)
    /// Default: none (in-memory store).
    pub store_url: Option<String>,

    /// API key sent with every store request.
    /// Env: `SUPABASE_ANON_KEY` (or `NEXT_PUBLIC_SUPABASE_ANON_KEY`)
    pub store_key: String,

    /// Presence service base URL.
    /// Env: `PRESENCE_API_URL`
    pub presence_url: String,

    /// Presence poll interval.
    /// Env: `PRESENCE_POLL_MS`
    /// Default: 15 s
    pub poll_interval: Duration,

    /// Timeout applied to every remote call.
    /// Env: `REQUEST_TIMEOUT_SECS`
    /// Default: 20 s
    pub request_timeout: Duration,

    /// Where downloaded images are saved.
    /// Env: `DOWNLOAD_DIR`
    /// Default: the platform download directory, else `.`
    pub download_dir: PathBuf,

    /// Gate secret.
    /// Env: `CAPSULE_SECRET`
    pub gate_secret: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_key: String::new(),
            presence_url: PRESENCE_API_URL.to_string(),
            poll_interval: Duration::from_millis(PRESENCE_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            download_dir: default_download_dir(),
            gate_secret: GATE_SECRET.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        config.store_url = first(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]);

        if let Some(key) = first(&["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            config.store_key = key;
        }

        if let Some(url) = first(&["PRESENCE_API_URL"]) {
            config.presence_url = url;
        }

        if let Some(val) = first(&["PRESENCE_POLL_MS"]) {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid PRESENCE_POLL_MS, using default"),
            }
        }

        if let Some(val) = first(&["REQUEST_TIMEOUT_SECS"]) {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(dir) = first(&["DOWNLOAD_DIR"]) {
            config.download_dir = PathBuf::from(dir);
        }

        if let Some(secret) = first(&["CAPSULE_SECRET"]) {
            config.gate_secret = secret;
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn default_download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert!(config.store_url.is_none());
        assert_eq!(config.poll_interval, Duration::from_millis(15_000));
        assert_eq!(config.presence_url, "https://api.lanyard.rest/v1");
        assert_eq!(config.gate_secret, "maurain");
    }

    #[test]
    fn test_public_names_are_fallbacks() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("NEXT_PUBLIC_SUPABASE_URL", "https://public.example"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "pk"),
        ]));
        assert_eq!(config.store_url.as_deref(), Some("https://public.example"));
        assert_eq!(config.store_key, "pk");

        let config = ClientConfig::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://primary.example"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://public.example"),
        ]));
        assert_eq!(config.store_url.as_deref(), Some("https://primary.example"));
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PRESENCE_POLL_MS", "soon"),
            ("REQUEST_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_millis(15_000));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PRESENCE_POLL_MS", "500"),
            ("DOWNLOAD_DIR", "/tmp/capsule"),
            ("CAPSULE_SECRET", "hunter2"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/capsule"));
        assert_eq!(config.gate_secret, "hunter2");
    }
}
