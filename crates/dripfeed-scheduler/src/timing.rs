// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot timing inside a tenant's daily posting window.
//!
//! Slots are centered on even subdivisions of the window, then nudged by an
//! independent uniform jitter per slot and clamped back into the window. A
//! window whose end hour is before its start hour crosses midnight; each
//! slot's calendar date falls out of plain minute arithmetic from the
//! window's opening midnight, so no slot depends on a previous slot's date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rand::Rng;

use dripfeed_core::Cadence;

/// Minutes in the daily window, hours inclusive on both ends.
fn window_minutes(cadence: &Cadence) -> i64 {
    let start = i64::from(cadence.window_start);
    let end = i64::from(cadence.window_end);
    let hours = if end >= start {
        end - start + 1
    } else {
        24 - start + end + 1
    };
    hours * 60
}

/// Jittered slot times for one day of the plan.
///
/// `day_index` counts days from `base_date`; the returned times are in
/// chronological slot order, each independently placed.
pub fn day_slot_times<R: Rng>(
    base_date: NaiveDate,
    day_index: u32,
    cadence: &Cadence,
    jitter_minutes: i64,
    rng: &mut R,
) -> Vec<DateTime<Utc>> {
    let n = i64::from(cadence.posts_per_day.max(1));
    let span = window_minutes(cadence);
    let interval = span / n;
    let window_open = i64::from(cadence.window_start) * 60;

    let midnight = base_date.and_time(NaiveTime::MIN).and_utc();

    (0..n)
        .map(|i| {
            let center = i * interval + interval / 2;
            let jitter = if jitter_minutes > 0 {
                rng.gen_range(-jitter_minutes..=jitter_minutes)
            } else {
                0
            };
            let offset = (center + jitter).clamp(0, span - 1);
            midnight
                + Duration::days(i64::from(day_index))
                + Duration::minutes(window_open + offset)
        })
        .collect()
}

/// True when `time` falls inside the cadence window on some day.
pub fn in_window(cadence: &Cadence, time: DateTime<Utc>) -> bool {
    use chrono::Timelike;
    let hour = time.hour() as u8;
    if cadence.window_end >= cadence.window_start {
        hour >= cadence.window_start && hour <= cadence.window_end
    } else {
        hour >= cadence.window_start || hour <= cadence.window_end
    }
}
