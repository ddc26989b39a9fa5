// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Dripfeed posting engine.
//!
//! Layered TOML configuration via Figment with `DRIPFEED_*` environment
//! overrides, plus [`ConfigTenantDirectory`], a
//! [`TenantDirectory`](dripfeed_core::TenantDirectory) implementation backed
//! by the `[tenants.*]` config sections.

pub mod loader;
pub mod model;
pub mod tenants;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::DripfeedConfig;
pub use tenants::ConfigTenantDirectory;
pub use validation::validate;

use dripfeed_core::DripfeedError;

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<DripfeedConfig, DripfeedError> {
    let config =
        load_config().map_err(|e| DripfeedError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}
