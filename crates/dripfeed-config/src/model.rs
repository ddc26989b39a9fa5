// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Dripfeed posting engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Dripfeed configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DripfeedConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Slot allocation settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Dispatch loop settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Repost-prevention lock settings.
    #[serde(default)]
    pub locks: LockConfig,

    /// Automated publishing settings.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Manual-review notification settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Cadence defaults applied to tenants without overrides, and to the
    /// legacy/global scope.
    #[serde(default)]
    pub defaults: TenantDefaults,

    /// Per-tenant overrides, keyed by tenant name.
    #[serde(default)]
    pub tenants: HashMap<String, TenantEntry>,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "dripfeed".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("dripfeed").join("dripfeed.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("dripfeed.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Slot allocation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Default planning horizon in days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Maximum random jitter applied to each slot time, in minutes, in
    /// either direction.
    #[serde(default = "default_jitter_minutes")]
    pub jitter_minutes: i64,

    /// Category that receives the remainder slots from largest-remainder
    /// rounding when category weights are configured.
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            jitter_minutes: default_jitter_minutes(),
            fallback_category: default_fallback_category(),
        }
    }
}

fn default_horizon_days() -> u32 {
    7
}

fn default_jitter_minutes() -> i64 {
    30
}

fn default_fallback_category() -> String {
    "general".to_string()
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Seconds between dispatch polling cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum due entries claimed per tenant per cycle. Kept small so a
    /// backlog of overdue entries drains gradually instead of flooding the
    /// review channel.
    #[serde(default = "default_max_claims_per_cycle")]
    pub max_claims_per_cycle: u32,

    /// Bound on each external publish/notify call, in seconds.
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,

    /// Retry attempts before an entry is terminally failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: i64,

    /// Base delay before a failed entry becomes claimable again, in seconds.
    /// Doubled per retry.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: i64,

    /// Hours each overdue entry of a paused tenant is shifted forward per
    /// reschedule pass.
    #[serde(default = "default_pause_shift_hours")]
    pub pause_shift_hours: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_claims_per_cycle: default_max_claims_per_cycle(),
            publish_timeout_secs: default_publish_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            pause_shift_hours: default_pause_shift_hours(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_claims_per_cycle() -> u32 {
    1
}

fn default_publish_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> i64 {
    3
}

fn default_retry_backoff_secs() -> i64 {
    300
}

fn default_pause_shift_hours() -> i64 {
    24
}

/// Repost-prevention lock configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Cooldown applied after a successful post, in hours.
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,

    /// Seconds between expired-lock sweep passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: default_cooldown_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_cooldown_hours() -> i64 {
    720 // 30 days
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

/// Automated publishing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Webhook endpoint for the automated publish path. `None` disables
    /// automated publishing regardless of per-tenant settings.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum automated publishes per rolling window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Rolling window length in seconds.
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window_secs(),
        }
    }
}

fn default_rate_limit() -> u32 {
    10
}

fn default_rate_window_secs() -> u64 {
    3600
}

/// Manual-review notification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    /// Webhook endpoint for review notifications. `None` means review
    /// notifications are logged only, which is suitable for development.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Cadence defaults for tenants without overrides and for the legacy/global
/// scope.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantDefaults {
    /// Include the legacy/global (NULL) scope in the periodic loops.
    #[serde(default = "default_enable_global")]
    pub enable_global: bool,

    #[serde(default = "default_posts_per_day")]
    pub posts_per_day: u32,

    /// First posting hour of the daily window (0-23).
    #[serde(default = "default_window_start")]
    pub window_start: u8,

    /// Last posting hour of the daily window (0-23), inclusive. A value
    /// below `window_start` describes a window crossing midnight.
    #[serde(default = "default_window_end")]
    pub window_end: u8,

    /// Automated-publish default for tenants without an explicit entry,
    /// including the legacy/global scope. Off by default: tenants opt in.
    #[serde(default)]
    pub auto_publish: bool,
}

impl Default for TenantDefaults {
    fn default() -> Self {
        Self {
            enable_global: default_enable_global(),
            posts_per_day: default_posts_per_day(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            auto_publish: false,
        }
    }
}

fn default_enable_global() -> bool {
    true
}

fn default_posts_per_day() -> u32 {
    3
}

fn default_window_start() -> u8 {
    9
}

fn default_window_end() -> u8 {
    17
}

/// Per-tenant configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantEntry {
    /// Posts per day; falls back to `[defaults]` when unset.
    #[serde(default)]
    pub posts_per_day: Option<u32>,

    /// Daily window start hour; falls back to `[defaults]` when unset.
    #[serde(default)]
    pub window_start: Option<u8>,

    /// Daily window end hour; falls back to `[defaults]` when unset.
    #[serde(default)]
    pub window_end: Option<u8>,

    /// When true, due entries are rescheduled forward instead of dispatched.
    #[serde(default)]
    pub paused: bool,

    /// Enable the automated publish path for this tenant; falls back to
    /// `[defaults]` when unset.
    #[serde(default)]
    pub auto_publish: Option<bool>,

    /// Category → ratio weights. Ratios must sum to 1.0.
    #[serde(default)]
    pub weights: Option<HashMap<String, f64>>,
}
