// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./dripfeed.toml` > `~/.config/dripfeed/dripfeed.toml`
//! > `/etc/dripfeed/dripfeed.toml` with environment variable overrides via the
//! `DRIPFEED_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DripfeedConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dripfeed/dripfeed.toml` (system-wide)
/// 3. `~/.config/dripfeed/dripfeed.toml` (user XDG config)
/// 4. `./dripfeed.toml` (local directory)
/// 5. `DRIPFEED_*` environment variables
pub fn load_config() -> Result<DripfeedConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DripfeedConfig::default()))
        .merge(Toml::file("/etc/dripfeed/dripfeed.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dripfeed/dripfeed.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dripfeed.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used by tests and by callers that already hold the config text.
pub fn load_config_from_str(toml_content: &str) -> Result<DripfeedConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DripfeedConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DripfeedConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DripfeedConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `DRIPFEED_STORAGE_DATABASE_PATH`
/// must map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("DRIPFEED_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("schedule_", "schedule.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("locks_", "locks.", 1)
            .replacen("publish_", "publish.", 1)
            .replacen("review_", "review.", 1)
            .replacen("defaults_", "defaults.", 1);
        mapped.into()
    })
}
