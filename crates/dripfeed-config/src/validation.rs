// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup validation for loaded configuration.
//!
//! Catches structurally valid but semantically broken settings (hour fields
//! out of range, weight ratios that cannot sum to 1.0) before any loop starts.

use dripfeed_core::DripfeedError;

use crate::model::DripfeedConfig;

/// Tolerance when checking that category ratios sum to 1.0.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Validate a loaded configuration, returning the first set of problems found.
pub fn validate(config: &DripfeedConfig) -> Result<(), DripfeedError> {
    let mut problems = Vec::new();

    check_hour("defaults.window_start", config.defaults.window_start, &mut problems);
    check_hour("defaults.window_end", config.defaults.window_end, &mut problems);

    if config.defaults.posts_per_day == 0 {
        problems.push("defaults.posts_per_day must be at least 1".to_string());
    }

    for (name, entry) in &config.tenants {
        if let Some(h) = entry.window_start {
            check_hour(&format!("tenants.{name}.window_start"), h, &mut problems);
        }
        if let Some(h) = entry.window_end {
            check_hour(&format!("tenants.{name}.window_end"), h, &mut problems);
        }
        if entry.posts_per_day == Some(0) {
            problems.push(format!("tenants.{name}.posts_per_day must be at least 1"));
        }
        if let Some(weights) = &entry.weights {
            if weights.is_empty() {
                problems.push(format!("tenants.{name}.weights must not be empty"));
            } else {
                let sum: f64 = weights.values().sum();
                if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
                    problems.push(format!(
                        "tenants.{name}.weights must sum to 1.0 (got {sum:.6})"
                    ));
                }
                if weights.values().any(|w| *w < 0.0) {
                    problems.push(format!("tenants.{name}.weights must be non-negative"));
                }
            }
        }
    }

    if config.dispatch.max_claims_per_cycle == 0 {
        problems.push("dispatch.max_claims_per_cycle must be at least 1".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(DripfeedError::Config(problems.join("; ")))
    }
}

fn check_hour(field: &str, value: u8, problems: &mut Vec<String>) {
    if value > 23 {
        problems.push(format!("{field} must be an hour in 0-23 (got {value})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn default_config_is_valid() {
        let config = load_config_from_str("").unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let config = load_config_from_str("[defaults]\nwindow_start = 25\n").unwrap();
        let err = validate(&config).expect_err("hour 25 should fail");
        assert!(err.to_string().contains("window_start"));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let config = load_config_from_str(
            "[tenants.a.weights]\nmeme = 0.5\nphoto = 0.4\n",
        )
        .unwrap();
        let err = validate(&config).expect_err("0.9 sum should fail");
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn exact_weights_pass() {
        let config = load_config_from_str(
            "[tenants.a.weights]\nmeme = 0.25\nphoto = 0.75\n",
        )
        .unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_posts_per_day_is_rejected() {
        let config = load_config_from_str("[tenants.a]\nposts_per_day = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }
}
