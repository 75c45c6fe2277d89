//! Environment-driven configuration. `Config::from_env` is the single
//! validation point: anything wrong here fails the process before it
//! touches the database or the upstream API.

use std::str::FromStr;
use std::sync::Once;

use anyhow::{bail, Context, Result};
use tracing::warn;

/// TMDB caps authenticated clients around 50 req/s.
const UPSTREAM_RATE_CAP: u32 = 50;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get required env var; error if missing or empty.
pub fn env_req(key: &str) -> Result<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => bail!("missing env var {key}"),
    }
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Tokens that deactivate a CRON schedule.
pub const CRON_DISABLE_TOKENS: &[&str] = &["", "false", "off", "disable", "disabled", "no"];

/// True when the raw schedule string is one of the disable tokens.
pub fn schedule_disabled(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    CRON_DISABLE_TOKENS.contains(&v.as_str())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_uri: String,
    pub enable_unaccent: bool,

    pub cron_full_sweep: String,
    pub cron_missing_only: String,
    pub cron_prune: String,
    pub cron_changes_sync: String,

    pub log_to_console: bool,
    pub log_lvl: u8,

    pub tmdb_read_access_token: String,
    pub tmdb_rate_limit: u32,
    pub tmdb_max_connections: u32,
    pub tmdb_batch_insert: usize,

    pub webhook_enabled: bool,
    pub webhook_bot_usr: Option<String>,
    pub webhook_bot_pw: Option<String>,
    pub webhook_url: Option<String>,

    pub api_enabled: bool,
    pub api_port: u16,
    pub api_key: Option<String>,

    pub shutdown_grace_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        init_env();

        let database_uri = env_req("DATABASE_URI")?;
        let tmdb_read_access_token = env_req("TMDB_READ_ACCESS_TOKEN")?;

        let mut tmdb_rate_limit: u32 = env_parse("TMDB_RATE_LIMIT", 45);
        if tmdb_rate_limit > UPSTREAM_RATE_CAP {
            warn!(
                requested = tmdb_rate_limit,
                cap = UPSTREAM_RATE_CAP,
                "TMDB_RATE_LIMIT above upstream cap; clamping"
            );
            tmdb_rate_limit = UPSTREAM_RATE_CAP;
        }
        if tmdb_rate_limit == 0 {
            bail!("TMDB_RATE_LIMIT must be at least 1");
        }

        let tmdb_max_connections: u32 = env_parse("TMDB_MAX_CONNECTIONS", 20);
        if tmdb_max_connections == 0 {
            bail!("TMDB_MAX_CONNECTIONS must be at least 1");
        }

        let tmdb_batch_insert: usize = env_parse("TMDB_BATCH_INSERT", 5000);
        if tmdb_batch_insert == 0 {
            bail!("TMDB_BATCH_INSERT must be at least 1");
        }

        let webhook_enabled = env_flag("WEBHOOK_ENABLED", false);
        let webhook_bot_usr = env_opt("WEBHOOK_BOT_USR");
        let webhook_bot_pw = env_opt("WEBHOOK_BOT_PW");
        let webhook_url = env_opt("WEBHOOK_URL");
        if webhook_enabled
            && (webhook_url.is_none() || webhook_bot_usr.is_none() || webhook_bot_pw.is_none())
        {
            bail!("WEBHOOK_ENABLED is set but WEBHOOK_URL / WEBHOOK_BOT_USR / WEBHOOK_BOT_PW are incomplete");
        }

        let api_port: u16 = env_parse("API_PORT", 8000);

        let cfg = Self {
            database_uri,
            enable_unaccent: env_flag("ENABLE_UNACCENT", false),
            cron_full_sweep: env_opt("CRON_FULL_SWEEP").unwrap_or_default(),
            cron_missing_only: env_opt("CRON_MISSING_ONLY").unwrap_or_default(),
            cron_prune: env_opt("CRON_PRUNE").unwrap_or_default(),
            cron_changes_sync: env_opt("CRON_CHANGES_SYNC").unwrap_or_default(),
            log_to_console: env_flag("LOG_TO_CONSOLE", true),
            log_lvl: env_parse("LOG_LVL", 20),
            tmdb_read_access_token,
            tmdb_rate_limit,
            tmdb_max_connections,
            tmdb_batch_insert,
            webhook_enabled,
            webhook_bot_usr,
            webhook_bot_pw,
            webhook_url,
            api_enabled: env_flag("API_ENABLED", false),
            api_port,
            api_key: env_opt("API_KEY"),
            shutdown_grace_secs: env_parse("SHUTDOWN_GRACE_SECS", 30),
        };

        for (name, raw) in [
            ("CRON_FULL_SWEEP", &cfg.cron_full_sweep),
            ("CRON_MISSING_ONLY", &cfg.cron_missing_only),
            ("CRON_PRUNE", &cfg.cron_prune),
            ("CRON_CHANGES_SYNC", &cfg.cron_changes_sync),
        ] {
            crate::jobs::scheduler::parse_schedule(raw)
                .with_context(|| format!("invalid {name}"))?;
        }

        Ok(cfg)
    }

    /// Level-filter directive derived from the numeric LOG_LVL
    /// (10 debug, 20 info, 30 warning, 40 error, 50 critical).
    pub fn log_level_str(&self) -> &'static str {
        if !self.log_to_console {
            return "warn";
        }
        match self.log_lvl {
            0..=10 => "debug",
            11..=20 => "info",
            21..=30 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_tokens_cover_all_forms() {
        for token in ["", "false", "off", "disable", "disabled", "no"] {
            assert!(schedule_disabled(token), "token {token:?}");
        }
        for token in ["FALSE", "Off", "DISABLED", "No", "  disable  "] {
            assert!(schedule_disabled(token), "token {token:?}");
        }
    }

    #[test]
    fn real_schedules_are_not_disabled() {
        assert!(!schedule_disabled("0 3 * * *"));
        assert!(!schedule_disabled("*/5 * * * *"));
        assert!(!schedule_disabled("nonsense"));
    }

    #[test]
    fn log_level_mapping() {
        let mut cfg = Config {
            database_uri: String::new(),
            enable_unaccent: false,
            cron_full_sweep: String::new(),
            cron_missing_only: String::new(),
            cron_prune: String::new(),
            cron_changes_sync: String::new(),
            log_to_console: true,
            log_lvl: 20,
            tmdb_read_access_token: String::new(),
            tmdb_rate_limit: 45,
            tmdb_max_connections: 20,
            tmdb_batch_insert: 5000,
            webhook_enabled: false,
            webhook_bot_usr: None,
            webhook_bot_pw: None,
            webhook_url: None,
            api_enabled: false,
            api_port: 8000,
            api_key: None,
            shutdown_grace_secs: 30,
        };
        assert_eq!(cfg.log_level_str(), "info");
        cfg.log_lvl = 10;
        assert_eq!(cfg.log_level_str(), "debug");
        cfg.log_lvl = 30;
        assert_eq!(cfg.log_level_str(), "warn");
        cfg.log_lvl = 50;
        assert_eq!(cfg.log_level_str(), "error");
        cfg.log_to_console = false;
        cfg.log_lvl = 20;
        assert_eq!(cfg.log_level_str(), "warn");
    }
}
