// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed startup configuration, loaded from `config.toml` and overridden by
//! environment variables prefixed `HVFLEET_`. Mirrors the field set of the
//! original Python `Settings`, translated from a mutable-global session
//! secret into an explicit value threaded through at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

fn default_true() -> bool {
    true
}

fn default_app_name() -> String {
    "hvfleet".to_string()
}

fn default_environment_name() -> String {
    "production".to_string()
}

fn default_jwks_cache_ttl_secs() -> u64 {
    300
}

fn default_max_token_age_secs() -> u64 {
    3600
}

fn default_session_max_age_secs() -> u64 {
    3600
}

fn default_inventory_refresh_interval_secs() -> u64 {
    60
}

fn default_job_worker_concurrency() -> usize {
    3
}

fn default_websocket_timeout_secs() -> u64 {
    1800
}

fn default_websocket_ping_interval_secs() -> u64 {
    30
}

fn default_agent_startup_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_interval_secs() -> f64 {
    2.0
}

fn default_job_retention() -> u64 {
    0
}

fn default_notification_retention() -> u64 {
    7 * 24 * 3600
}

fn default_winrm_transport() -> String {
    "ntlm".to_string()
}

fn default_winrm_port() -> u16 {
    5985
}

fn default_scheduler_min_workers() -> usize {
    2
}

fn default_scheduler_max_workers() -> usize {
    16
}

fn default_scheduler_idle_secs() -> u64 {
    60
}

fn default_scheduler_scale_up_backlog() -> usize {
    4
}

fn default_scheduler_scale_up_duration_threshold_secs() -> f64 {
    5.0
}

/// Top-level daemon configuration. Every field has a sensible default so a
/// bare `config.toml` (or none at all, relying purely on env vars) still
/// boots in dev mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_environment_name")]
    pub environment_name: String,

    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default = "default_true")]
    pub allow_dev_auth: bool,

    #[serde(default)]
    pub oidc_issuer_url: Option<String>,
    #[serde(default)]
    pub oidc_client_id: Option<String>,
    #[serde(default)]
    pub oidc_client_secret: Option<String>,
    #[serde(default)]
    pub oidc_role_name: Option<String>,
    #[serde(default)]
    pub oidc_redirect_uri: Option<String>,
    #[serde(default)]
    pub oidc_force_https: bool,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
    #[serde(default = "default_max_token_age_secs")]
    pub max_token_age_secs: u64,
    #[serde(default = "default_session_max_age_secs")]
    pub session_max_age_secs: u64,

    #[serde(default)]
    pub hyperv_hosts: Vec<String>,
    #[serde(default)]
    pub winrm_username: Option<String>,
    #[serde(default)]
    pub winrm_password: Option<String>,
    #[serde(default = "default_winrm_transport")]
    pub winrm_transport: String,
    #[serde(default = "default_winrm_port")]
    pub winrm_port: u16,

    #[serde(default = "default_inventory_refresh_interval_secs")]
    pub inventory_refresh_interval_secs: u64,

    #[serde(default = "default_job_worker_concurrency")]
    pub job_worker_concurrency: usize,
    #[serde(default = "default_job_retention")]
    pub job_retention_secs: u64,
    #[serde(default = "default_notification_retention")]
    pub notification_retention_secs: u64,
    #[serde(default)]
    pub retention_sweep_interval_secs: Option<u64>,

    #[serde(default = "default_websocket_timeout_secs")]
    pub websocket_timeout_secs: u64,
    #[serde(default = "default_websocket_ping_interval_secs")]
    pub websocket_ping_interval_secs: u64,

    #[serde(default)]
    pub dummy_data: bool,

    #[serde(default)]
    pub host_install_directory: Option<String>,
    #[serde(default = "default_agent_startup_concurrency")]
    pub agent_startup_concurrency: usize,
    #[serde(default)]
    pub agent_artifacts_path: Option<String>,
    #[serde(default)]
    pub http_mount_path: Option<String>,
    #[serde(default)]
    pub download_base_url: Option<String>,
    #[serde(default = "default_max_attempts")]
    pub deployment_max_attempts: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub deployment_retry_interval_secs: f64,

    #[serde(default)]
    pub listen_addr: Option<String>,

    #[serde(default = "default_scheduler_min_workers")]
    pub scheduler_min_workers: usize,
    #[serde(default = "default_scheduler_max_workers")]
    pub scheduler_max_workers: usize,
    #[serde(default = "default_scheduler_idle_secs")]
    pub scheduler_idle_secs: u64,
    #[serde(default = "default_scheduler_scale_up_backlog")]
    pub scheduler_scale_up_backlog: usize,
    #[serde(default = "default_scheduler_scale_up_duration_threshold_secs")]
    pub scheduler_scale_up_duration_threshold_secs: f64,
}

impl Default for Settings {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        // Every field carries a `#[serde(default = ...)]` or `Option`, so
        // deserializing the empty document can never fail.
        toml::from_str("").expect("empty toml deserializes via field defaults")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Settings {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads from an optional config file (defaults applied for anything
    /// the file omits, or for every field when no file is given at all),
    /// then overlays any `HVFLEET_*` environment variables present in the
    /// process. Env vars always win over the file, matching the "env
    /// overrides file" convention the rest of the organization's services
    /// use.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Overlays `HVFLEET_*` environment variables onto already-loaded
    /// settings. Unset or unparseable variables are left untouched rather
    /// than failing the whole load — a single bad `HVFLEET_JOB_WORKER_CONCURRENCY`
    /// shouldn't keep the rest of the environment from taking effect; the
    /// startup validation pass is what surfaces the resulting
    /// misconfiguration to the operator.
    pub fn apply_env_overrides(&mut self) {
        fn env_string(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        }
        fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            env_string(key).and_then(|v| v.parse().ok())
        }
        fn env_bool(key: &str) -> Option<bool> {
            env_string(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        }
        fn env_list(key: &str) -> Option<Vec<String>> {
            env_string(key).map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        }

        if let Some(v) = env_string("HVFLEET_APP_NAME") {
            self.app_name = v;
        }
        if let Some(v) = env_bool("HVFLEET_DEBUG") {
            self.debug = v;
        }
        if let Some(v) = env_string("HVFLEET_ENVIRONMENT_NAME") {
            self.environment_name = v;
        }
        if let Some(v) = env_bool("HVFLEET_AUTH_ENABLED") {
            self.auth_enabled = v;
        }
        if let Some(v) = env_bool("HVFLEET_ALLOW_DEV_AUTH") {
            self.allow_dev_auth = v;
        }
        if let Some(v) = env_string("HVFLEET_OIDC_ISSUER_URL") {
            self.oidc_issuer_url = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_OIDC_CLIENT_ID") {
            self.oidc_client_id = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_OIDC_CLIENT_SECRET") {
            self.oidc_client_secret = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_OIDC_ROLE_NAME") {
            self.oidc_role_name = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_OIDC_REDIRECT_URI") {
            self.oidc_redirect_uri = Some(v);
        }
        if let Some(v) = env_bool("HVFLEET_OIDC_FORCE_HTTPS") {
            self.oidc_force_https = v;
        }
        if let Some(v) = env_string("HVFLEET_API_TOKEN") {
            self.api_token = Some(v);
        }
        if let Some(v) = env_parsed("HVFLEET_JWKS_CACHE_TTL_SECS") {
            self.jwks_cache_ttl_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_MAX_TOKEN_AGE_SECS") {
            self.max_token_age_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_SESSION_MAX_AGE_SECS") {
            self.session_max_age_secs = v;
        }
        if let Some(v) = env_list("HVFLEET_HYPERV_HOSTS") {
            self.hyperv_hosts = v;
        }
        if let Some(v) = env_string("HVFLEET_WINRM_USERNAME") {
            self.winrm_username = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_WINRM_PASSWORD") {
            self.winrm_password = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_WINRM_TRANSPORT") {
            self.winrm_transport = v;
        }
        if let Some(v) = env_parsed("HVFLEET_WINRM_PORT") {
            self.winrm_port = v;
        }
        if let Some(v) = env_parsed("HVFLEET_INVENTORY_REFRESH_INTERVAL_SECS") {
            self.inventory_refresh_interval_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_JOB_WORKER_CONCURRENCY") {
            self.job_worker_concurrency = v;
        }
        if let Some(v) = env_parsed("HVFLEET_JOB_RETENTION_SECS") {
            self.job_retention_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_NOTIFICATION_RETENTION_SECS") {
            self.notification_retention_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_RETENTION_SWEEP_INTERVAL_SECS") {
            self.retention_sweep_interval_secs = Some(v);
        }
        if let Some(v) = env_parsed("HVFLEET_WEBSOCKET_TIMEOUT_SECS") {
            self.websocket_timeout_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_WEBSOCKET_PING_INTERVAL_SECS") {
            self.websocket_ping_interval_secs = v;
        }
        if let Some(v) = env_bool("HVFLEET_DUMMY_DATA") {
            self.dummy_data = v;
        }
        if let Some(v) = env_string("HVFLEET_HOST_INSTALL_DIRECTORY") {
            self.host_install_directory = Some(v);
        }
        if let Some(v) = env_parsed("HVFLEET_AGENT_STARTUP_CONCURRENCY") {
            self.agent_startup_concurrency = v;
        }
        if let Some(v) = env_string("HVFLEET_AGENT_ARTIFACTS_PATH") {
            self.agent_artifacts_path = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_HTTP_MOUNT_PATH") {
            self.http_mount_path = Some(v);
        }
        if let Some(v) = env_string("HVFLEET_DOWNLOAD_BASE_URL") {
            self.download_base_url = Some(v);
        }
        if let Some(v) = env_parsed("HVFLEET_DEPLOYMENT_MAX_ATTEMPTS") {
            self.deployment_max_attempts = v;
        }
        if let Some(v) = env_parsed("HVFLEET_DEPLOYMENT_RETRY_INTERVAL_SECS") {
            self.deployment_retry_interval_secs = v;
        }
        if let Some(v) = env_string("HVFLEET_LISTEN_ADDR") {
            self.listen_addr = Some(v);
        }
        if let Some(v) = env_parsed("HVFLEET_SCHEDULER_MIN_WORKERS") {
            self.scheduler_min_workers = v;
        }
        if let Some(v) = env_parsed("HVFLEET_SCHEDULER_MAX_WORKERS") {
            self.scheduler_max_workers = v;
        }
        if let Some(v) = env_parsed("HVFLEET_SCHEDULER_IDLE_SECS") {
            self.scheduler_idle_secs = v;
        }
        if let Some(v) = env_parsed("HVFLEET_SCHEDULER_SCALE_UP_BACKLOG") {
            self.scheduler_scale_up_backlog = v;
        }
        if let Some(v) = env_parsed("HVFLEET_SCHEDULER_SCALE_UP_DURATION_THRESHOLD_SECS") {
            self.scheduler_scale_up_duration_threshold_secs = v;
        }
    }

    /// Validate cross-field invariants the individual field defaults can't
    /// express: OIDC requires its full quartet, auth requires either OIDC
    /// or a static token unless dev auth is explicitly allowed.
    /// Runs every cross-field check and collects all violations instead of
    /// returning on the first one, so an operator sees every misconfiguration
    /// in a single startup log rather than fixing issues one at a time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        if self.auth_enabled {
            let oidc_configured = self.oidc_issuer_url.is_some() && self.oidc_client_id.is_some();
            if !oidc_configured && self.api_token.is_none() && !self.allow_dev_auth {
                violations.push("auth_enabled requires oidc_issuer_url+oidc_client_id, api_token, or allow_dev_auth".to_string());
            }
        }
        if self.job_worker_concurrency == 0 {
            violations.push("job_worker_concurrency must be at least 1".to_string());
        }
        if self.scheduler_min_workers == 0 {
            violations.push("scheduler_min_workers must be at least 1".to_string());
        }
        if self.scheduler_max_workers < self.scheduler_min_workers {
            violations.push("scheduler_max_workers must be >= scheduler_min_workers".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(violations.join("; ")))
        }
    }

    pub fn inventory_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.inventory_refresh_interval_secs)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn notification_retention(&self) -> Duration {
        Duration::from_secs(self.notification_retention_secs)
    }

    /// How often the janitor wakes to sweep terminal jobs/aged
    /// notifications; defaults to a tenth of the job retention window
    /// (floored at one minute) when not configured explicitly.
    pub fn retention_sweep_interval(&self) -> Duration {
        match self.retention_sweep_interval_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(60),
        }
    }

    pub fn websocket_timeout(&self) -> Duration {
        Duration::from_secs(self.websocket_timeout_secs)
    }

    pub fn websocket_ping_interval(&self) -> Duration {
        Duration::from_secs(self.websocket_ping_interval_secs)
    }

    pub fn deployment_retry_interval(&self) -> Duration {
        Duration::from_secs_f64(self.deployment_retry_interval_secs)
    }

    pub fn scheduler_idle(&self) -> Duration {
        Duration::from_secs(self.scheduler_idle_secs)
    }

    pub fn scheduler_scale_up_duration_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.scheduler_scale_up_duration_threshold_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
