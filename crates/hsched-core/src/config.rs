use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::transport::HandleTemplate;

/// Scheduler configuration loaded from `~/.config/hsched/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Transport handles kept warm after idle eviction.
    pub min_sessions: usize,
    /// Cap on total open connections across all pooled handles (0 = no cap).
    pub max_requests: usize,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: Option<u32>,
    pub low_speed_time_secs: Option<u64>,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let template = HandleTemplate::default();
        Self {
            min_sessions: 1,
            max_requests: 5,
            low_speed_limit: None,
            low_speed_time_secs: None,
            user_agent: template.user_agent,
            connect_timeout_secs: template.connect_timeout.as_secs(),
            follow_redirects: template.follow_redirects,
            max_redirects: template.max_redirects,
        }
    }
}

impl SchedulerConfig {
    /// Handle defaults derived from this config.
    pub fn handle_template(&self) -> HandleTemplate {
        HandleTemplate {
            user_agent: self.user_agent.clone(),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: self.low_speed_time_secs.map(Duration::from_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
        }
    }

    /// Apply `HSCHED_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable numbers are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = parse_var(&lookup, "HSCHED_MIN_SESSIONS") {
            self.min_sessions = n;
        }
        if let Some(n) = parse_var(&lookup, "HSCHED_MAX_REQUESTS") {
            self.max_requests = n;
        }
        if let Some(n) = parse_var(&lookup, "HSCHED_LOW_SPEED_LIMIT") {
            self.low_speed_limit = Some(n);
        }
        if let Some(n) = parse_var(&lookup, "HSCHED_LOW_SPEED_TIME") {
            self.low_speed_time_secs = Some(n);
        }
        if let Some(ua) = lookup("HSCHED_USER_AGENT") {
            self.user_agent = ua;
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hsched")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<SchedulerConfig> {
    let path = config_path()?;
    let mut cfg = if !path.exists() {
        let default_cfg = SchedulerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    } else {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data)?
    };
    cfg.apply_env();
    Ok(cfg)
}
