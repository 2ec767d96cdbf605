//! Config & Secrets Contract (spec.md §4.11).
//!
//! Settings are loaded lazily on first access, not at process start, and
//! cached process-wide. A test-only reset hook clears the cache so tests
//! can observe a fresh environment. Mirrors the `OnceLock`-guarded lazy
//! table in `rand-loop/rlm-core`'s query router and the lazily-installed
//! Prometheus handle in Mira's `metrics` module.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// The provider secrets this engine recognises (spec.md §6).
pub const PROVIDER_ENV_KEYS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("grok", "GROK_API_KEY"),
    ("deepseek", "DEEPSEEK_API_KEY"),
    ("together", "TOGETHER_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

/// Inbound API key env var name, for the `X-API-Key` header check.
pub const INBOUND_API_KEY_ENV: &str = "API_KEY";

/// Presence of a secret, by name only — never the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPresence {
    pub provider: String,
    pub configured: bool,
}

/// Process-lifetime settings snapshot, computed once on first access.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Which provider secrets are present, keyed by provider id.
    secrets: Vec<SecretPresence>,
    /// Inbound API key, if the deployment requires one. Never exposed verbatim.
    inbound_api_key: Option<String>,
    /// `LOG_LEVEL` env var, defaults to "info".
    pub log_level: String,
    /// Allowed CORS origins, comma-separated in `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Deployment environment label (`ENVIRONMENT`), defaults to "development".
    pub environment: String,
}

impl Settings {
    fn load() -> Self {
        // Best-effort local .env load; never overrides an already-set var.
        let _ = dotenvy::dotenv();

        let secrets = PROVIDER_ENV_KEYS
            .iter()
            .map(|(provider, key)| SecretPresence {
                provider: provider.to_string(),
                configured: env_is_configured(key),
            })
            .collect();

        let inbound_api_key = std::env::var(INBOUND_API_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty());

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self {
            secrets,
            inbound_api_key,
            log_level,
            cors_origins,
            environment,
        }
    }

    /// Which provider classes are enabled given currently configured secrets.
    pub fn enabled_providers(&self) -> Vec<String> {
        self.secrets
            .iter()
            .filter(|s| s.configured)
            .map(|s| s.provider.clone())
            .collect()
    }

    pub fn disabled_providers(&self) -> Vec<String> {
        self.secrets
            .iter()
            .filter(|s| !s.configured)
            .map(|s| s.provider.clone())
            .collect()
    }

    pub fn secret_presence(&self) -> &[SecretPresence] {
        &self.secrets
    }

    pub fn provider_configured(&self, provider: &str) -> bool {
        self.secrets
            .iter()
            .any(|s| s.provider == provider && s.configured)
    }

    /// Validates the inbound `X-API-Key` header against the configured key.
    /// Returns `true` (authorized) when no inbound key is configured — the
    /// spec describes the header as used "when configured" (spec.md §6).
    pub fn authorize_inbound(&self, header_value: Option<&str>) -> bool {
        match &self.inbound_api_key {
            None => true,
            Some(expected) => header_value == Some(expected.as_str()),
        }
    }

    /// A diagnostic snapshot safe to return from `/v1/status/diagnostics/config`.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            providers_loaded: self
                .secrets
                .iter()
                .map(|s| (s.provider.clone(), s.configured))
                .collect(),
            provider_count: self.enabled_providers().len(),
            is_valid: !self.enabled_providers().is_empty(),
            warnings: self.warnings(),
        }
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.enabled_providers().is_empty() {
            warnings.push("no provider secrets configured".to_string());
        }
        if self.inbound_api_key.is_none() {
            warnings.push("inbound API_KEY not set; endpoints are unauthenticated".to_string());
        }
        warnings
    }
}

fn env_is_configured(key: &str) -> bool {
    std::env::var(key).map(|v| !v.is_empty()).unwrap_or(false)
}

/// Structured diagnostics payload for `GET /v1/status/diagnostics/config`
/// (spec.md §6). Never carries secret values, only presence flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub providers_loaded: std::collections::BTreeMap<String, bool>,
    pub provider_count: usize,
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Returns the process-wide settings, loading them lazily on first call.
pub fn settings() -> Settings {
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(existing) = guard.as_ref() {
            return existing.clone();
        }
    }
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    if guard.is_none() {
        *guard = Some(Settings::load());
    }
    guard.as_ref().expect("just inserted").clone()
}

/// Test-only hook: drops the cached settings so the next `settings()` call
/// re-reads the environment. Never call this from non-test code.
#[doc(hidden)]
pub fn reset_for_test() {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Settings touches process env; serialize tests that mutate it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn no_value_before_first_touch() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_for_test();
        // Accessing settings() is the only way to populate it; the module
        // itself never reads env vars at import time (no top-level statics
        // besides the empty OnceLock-equivalent).
        std::env::remove_var("OPENAI_API_KEY");
        let s = settings();
        assert!(!s.provider_configured("openai"));
    }

    #[test]
    fn reload_observes_new_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_for_test();
        std::env::remove_var("ANTHROPIC_API_KEY");
        assert!(!settings().provider_configured("anthropic"));

        std::env::set_var("ANTHROPIC_API_KEY", "sk-test-key");
        reset_for_test();
        assert!(settings().provider_configured("anthropic"));
        std::env::remove_var("ANTHROPIC_API_KEY");
        reset_for_test();
    }

    #[test]
    fn diagnostics_never_leaks_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("GEMINI_API_KEY", "super-secret-value-123");
        reset_for_test();
        let snapshot = settings().diagnostics();
        let serialized = serde_json::to_string(&snapshot).unwrap();
        assert!(!serialized.contains("super-secret-value-123"));
        std::env::remove_var("GEMINI_API_KEY");
        reset_for_test();
    }

    #[test]
    fn authorize_inbound_open_when_unconfigured() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("API_KEY");
        reset_for_test();
        assert!(settings().authorize_inbound(None));
        assert!(settings().authorize_inbound(Some("anything")));
    }

    #[test]
    fn authorize_inbound_checks_value_when_configured() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("API_KEY", "secret-token");
        reset_for_test();
        assert!(!settings().authorize_inbound(None));
        assert!(!settings().authorize_inbound(Some("wrong")));
        assert!(settings().authorize_inbound(Some("secret-token")));
        std::env::remove_var("API_KEY");
        reset_for_test();
    }
}
