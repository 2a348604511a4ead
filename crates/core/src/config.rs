use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub worker: WorkerConfig,
    pub sms: SmsConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VIGIL_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VIGIL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            worker: WorkerConfig::from_env_profiled(p),
            sms: SmsConfig::from_env_profiled(p),
            chat: ChatConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:  concurrency={}, max_ticks={}",
            self.engine.concurrency,
            self.engine.max_ticks
        );
        tracing::info!("  worker:  poll_interval={}s", self.worker.poll_interval_secs);
        tracing::info!(
            "  sms:     gateway={}",
            self.sms.gateway_url.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  chat:    configured={}", self.chat.is_configured());
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of followed entities evaluated concurrently.
    pub concurrency: usize,
    /// Upper bound on timestamps produced by one catch-up/aggregate pass.
    pub max_ticks: usize,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            concurrency: profiled_env_usize(p, "VIGIL_CONCURRENCY", 8).max(1),
            max_ticks: profiled_env_usize(p, "VIGIL_MAX_TICKS", 10_000).max(1),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_ticks: 10_000,
        }
    }
}

// ── Worker ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub poll_interval_secs: u64,
}

impl WorkerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            poll_interval_secs: profiled_env_u64(p, "VIGIL_POLL_INTERVAL", 60).max(1),
        }
    }
}

// ── SMS gateway ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    pub sender: Option<String>,
}

impl SmsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            gateway_url: profiled_env_opt(p, "SMS_GATEWAY_URL"),
            api_key: profiled_env_opt(p, "SMS_API_KEY"),
            sender: profiled_env_opt(p, "SMS_SENDER"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway_url.is_some()
    }
}

// ── Chat space webhook ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub webhook_url: Option<String>,
}

impl ChatConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "CHAT_WEBHOOK_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}
